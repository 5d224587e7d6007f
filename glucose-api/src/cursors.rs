use crate::models;
use crate::problem::{Problem, BAD_REQUEST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Keyset cursor into the measurement list: the `updated_at` and `id` of the last measurement on
/// the previous page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlucoseMeasurements(pub DateTime<Utc>, pub i32);

impl FromStr for GlucoseMeasurements {
    type Err = Problem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|_| BAD_REQUEST)
    }
}

impl From<GlucoseMeasurements> for String {
    fn from(cursor: GlucoseMeasurements) -> Self {
        // A tuple of a timestamp and an integer always serializes.
        serde_json::to_string(&cursor).unwrap_or_default()
    }
}

impl GlucoseMeasurements {
    pub const PER_PAGE: usize = 100;

    pub fn next_from_page(page: &[models::GlucoseMeasurement]) -> Option<Self> {
        if page.len() >= Self::PER_PAGE {
            page.last()
                .map(|measurement| Self(measurement.updated_at, measurement.id))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::GlucoseMeasurements;
    use crate::models;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    /// `count` measurements, most recently updated first, as a page query returns them.
    fn page(count: usize) -> Vec<models::GlucoseMeasurement> {
        let tested_at = NaiveDate::from_ymd_opt(2024, 4, 24)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let newest = Utc.from_utc_datetime(&tested_at);

        (0..count)
            .map(|i| models::GlucoseMeasurement {
                id: 1000 - i as i32,
                subject_id: "user-1".to_owned(),
                value: 100,
                tested_at,
                tz_offset: "Z".to_owned(),
                created_at: newest,
                updated_at: newest - Duration::minutes(i as i64),
            })
            .collect()
    }

    #[test]
    fn cursor_survives_the_query_string() {
        let updated_at = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 4, 24)
                .unwrap()
                .and_hms_micro_opt(8, 30, 0, 123_456)
                .unwrap(),
        );
        let cursor = GlucoseMeasurements(updated_at, 42);

        let encoded: String = cursor.into();
        let decoded: GlucoseMeasurements = encoded.parse().unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn reject_garbage_cursor() {
        assert!("not-a-cursor".parse::<GlucoseMeasurements>().is_err());
        assert!("[\"2024-04-24T08:30:00Z\"]"
            .parse::<GlucoseMeasurements>()
            .is_err());
    }

    #[test]
    fn no_next_cursor_for_a_partial_page() {
        assert_eq!(GlucoseMeasurements::next_from_page(&[]), None);
        assert_eq!(
            GlucoseMeasurements::next_from_page(&page(GlucoseMeasurements::PER_PAGE - 1)),
            None
        );
    }

    #[test]
    fn full_page_continues_after_its_last_measurement() {
        let page = page(GlucoseMeasurements::PER_PAGE);
        let last = page.last().unwrap();

        assert_eq!(
            GlucoseMeasurements::next_from_page(&page),
            Some(GlucoseMeasurements(last.updated_at, last.id))
        );
        assert_eq!(last.id, 901);
    }
}
