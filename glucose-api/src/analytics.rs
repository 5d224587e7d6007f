//! Trailing-window glucose statistics.
//!
//! Four windows are derived from a reference instant: the current week and the week before it,
//! and the current month (up to the reference day) and the full month before it. Each window is
//! reduced to an average and the percentages of readings above and below the target range, and
//! each current period is compared against its predecessor.
//!
//! Everything here is pure. Readings are fetched through [`ReadingSource`], which the database
//! connection implements, so the arithmetic can be exercised on in-memory readings.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Readings strictly above this value (mg/dL) count as above range.
pub const HIGH_THRESHOLD: i32 = 180;

/// Readings strictly below this value (mg/dL) count as below range.
pub const LOW_THRESHOLD: i32 = 70;

/// A single glucose reading, as far as the statistics are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    pub value: i32,
    pub tested_at: NaiveDateTime,
}

/// A period of whole days on the naive (subject-local) time line.
///
/// `start` is the first second of the first day and `end` the last second of the last day, both
/// inclusive. Readings with sub-second precision in the final second still belong to the window:
/// membership is `start <= t < end + 1s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    /// The window spanning the days `first..=last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Window {
            start: start_of_day(first),
            end: start_of_day(last + Duration::days(1)) - Duration::seconds(1),
        }
    }

    /// The seven days ending with (and including) `day`.
    pub fn week_ending(day: NaiveDate) -> Self {
        Self::days(day - Duration::days(6), day)
    }

    /// The seven days immediately before this window starts.
    pub fn preceding_week(&self) -> Self {
        let first = self.start.date();
        Self::days(first - Duration::days(7), first - Duration::days(1))
    }

    /// The first of `day`'s month up to and including `day`.
    pub fn month_to_day(day: NaiveDate) -> Self {
        Self::days(first_of_month(day), day)
    }

    /// The full calendar month before `day`'s month.
    pub fn previous_month(day: NaiveDate) -> Self {
        let last = first_of_month(day) - Duration::days(1);
        Self::days(first_of_month(last), last)
    }

    /// The first instant after the window.
    pub fn end_exclusive(&self) -> NaiveDateTime {
        self.end + Duration::seconds(1)
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end_exclusive()
    }
}

fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::default())
}

fn first_of_month(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.day0()))
}

/// The four windows belonging to a reference instant. Only the instant's date matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Windows {
    pub current_week: Window,
    pub previous_week: Window,
    pub current_month: Window,
    pub previous_month: Window,
}

impl Windows {
    pub fn for_reference(reference: NaiveDateTime) -> Self {
        let day = reference.date();
        let current_week = Window::week_ending(day);

        Windows {
            current_week,
            previous_week: current_week.preceding_week(),
            current_month: Window::month_to_day(day),
            previous_month: Window::previous_month(day),
        }
    }
}

/// A range query over stored readings.
pub trait ReadingSource {
    type Error;

    /// All readings whose `tested_at` lies in the window, of the given subject or of all
    /// subjects. Order is irrelevant.
    fn readings(
        &mut self,
        window: &Window,
        subject_id: Option<&str>,
    ) -> Result<Vec<Reading>, Self::Error>;
}

/// Statistics of the readings in one window. Every metric is `None` when the window is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    pub average: Option<f64>,
    pub time_above_range: Option<f64>,
    pub time_below_range: Option<f64>,
}

impl WindowStats {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let mut count = 0usize;
        let mut sum = 0i64;
        let mut above = 0usize;
        let mut below = 0usize;

        for value in values {
            count += 1;
            sum += i64::from(value);
            if value > HIGH_THRESHOLD {
                above += 1;
            }
            if value < LOW_THRESHOLD {
                below += 1;
            }
        }

        if count == 0 {
            return WindowStats::default();
        }

        let n = count as f64;
        WindowStats {
            count,
            average: Some(round1(sum as f64 / n)),
            time_above_range: Some(round1(above as f64 / n * 100.0)),
            time_below_range: Some(round1(below as f64 / n * 100.0)),
        }
    }

    pub fn from_readings(readings: &[Reading]) -> Self {
        Self::from_values(readings.iter().map(|reading| reading.value))
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// `current - previous`, or `None` if either is missing.
pub fn change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(current), Some(previous)) => Some(round1(current - previous)),
        _ => None,
    }
}

/// The change relative to `previous` in percent, or `None` if either is missing or `previous` is
/// zero.
pub fn change_percent(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(current), Some(previous)) if previous != 0.0 => {
            Some(round1((current - previous) / previous * 100.0))
        }
        _ => None,
    }
}

/// One period compared against the period of the same length before it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub average: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub time_above_range: Option<f64>,
    pub time_above_range_change: Option<f64>,
    pub time_above_range_change_percent: Option<f64>,
    pub time_below_range: Option<f64>,
    pub time_below_range_change: Option<f64>,
    pub time_below_range_change_percent: Option<f64>,
}

impl PeriodSummary {
    pub fn compare(window: &Window, current: &WindowStats, previous: &WindowStats) -> Self {
        PeriodSummary {
            average: current.average,
            change: change(current.average, previous.average),
            change_percent: change_percent(current.average, previous.average),
            period_start: window.start,
            period_end: window.end,
            time_above_range: current.time_above_range,
            time_above_range_change: change(current.time_above_range, previous.time_above_range),
            time_above_range_change_percent: change_percent(
                current.time_above_range,
                previous.time_above_range,
            ),
            time_below_range: current.time_below_range,
            time_below_range_change: change(current.time_below_range, previous.time_below_range),
            time_below_range_change_percent: change_percent(
                current.time_below_range,
                previous.time_below_range,
            ),
        }
    }
}

/// Week-over-week and month-over-month summaries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GlucoseAverages {
    pub weekly: PeriodSummary,
    pub monthly: PeriodSummary,
}

/// Compute the summaries for `reference` from the readings in `source`.
///
/// Errors of the source are passed through untouched; nothing is retried.
pub fn glucose_averages<S>(
    source: &mut S,
    reference: NaiveDateTime,
    subject_id: Option<&str>,
) -> Result<GlucoseAverages, S::Error>
where
    S: ReadingSource + ?Sized,
{
    let windows = Windows::for_reference(reference);
    tracing::debug!(
        "Glucose averages for reference {}: current week {} to {}, previous week {} to {}, current month {} to {}, previous month {} to {}",
        reference,
        windows.current_week.start,
        windows.current_week.end,
        windows.previous_week.start,
        windows.previous_week.end,
        windows.current_month.start,
        windows.current_month.end,
        windows.previous_month.start,
        windows.previous_month.end,
    );

    let current_week = window_stats(source, &windows.current_week, subject_id)?;
    let previous_week = window_stats(source, &windows.previous_week, subject_id)?;
    let current_month = window_stats(source, &windows.current_month, subject_id)?;
    let previous_month = window_stats(source, &windows.previous_month, subject_id)?;

    Ok(GlucoseAverages {
        weekly: PeriodSummary::compare(&windows.current_week, &current_week, &previous_week),
        monthly: PeriodSummary::compare(&windows.current_month, &current_month, &previous_month),
    })
}

fn window_stats<S>(
    source: &mut S,
    window: &Window,
    subject_id: Option<&str>,
) -> Result<WindowStats, S::Error>
where
    S: ReadingSource + ?Sized,
{
    let readings = source.readings(window, subject_id)?;
    let stats = WindowStats::from_readings(&readings);
    tracing::debug!(
        "Window {} to {}: {} readings, average {:?}, above range {:?}%, below range {:?}%",
        window.start,
        window.end,
        stats.count,
        stats.average,
        stats.time_above_range,
        stats.time_below_range,
    );
    Ok(stats)
}
