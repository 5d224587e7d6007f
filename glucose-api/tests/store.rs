//! Round trips through a real PostgreSQL database. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`. Everything happens inside a test
//! transaction that is rolled back.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::{Connection, PgConnection};

use glucose_api::admin::migrate;
use glucose_api::analytics::{self, Window};
use glucose_api::config::DEFAULT_DATABASE_URL;
use glucose_api::models::{
    GlucoseMeasurement, GlucoseMeasurementId, NewGlucoseMeasurement, UpdateGlucoseMeasurement,
};

fn connection() -> PgConnection {
    glucose_api::utils::tracing::init_for_tests();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());
    let mut conn = glucose_api::database::oneoff_connection(&database_url).unwrap();
    conn.begin_test_transaction().unwrap();
    migrate::run(&mut conn).unwrap();
    conn
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn new(subject_id: &str, value: i32, tested_at: NaiveDateTime) -> NewGlucoseMeasurement {
    NewGlucoseMeasurement {
        subject_id: subject_id.to_owned(),
        value,
        tested_at,
        tz_offset: "-07:00".to_owned(),
    }
}

#[test]
#[ignore]
fn create_read_update_delete() {
    let mut conn = connection();

    let created = new("store-subject", 101, at(20, 8)).create(&mut conn).unwrap();
    assert_eq!(created.value, 101);

    let read = GlucoseMeasurement::by_id(&mut conn, created.get_id()).unwrap();
    assert_eq!(read.as_ref(), Some(&created));

    let mut update = UpdateGlucoseMeasurement::unchanged_for_id(created.get_id());
    update.value = Some(140);
    let updated = update.update(&mut conn).unwrap();
    assert_eq!(updated.value, 140);
    assert_eq!(updated.subject_id, created.subject_id);
    assert_eq!(updated.tested_at, created.tested_at);
    assert!(updated.updated_at >= created.updated_at);

    assert!(GlucoseMeasurement::delete(&mut conn, created.get_id()).unwrap());
    assert!(!GlucoseMeasurement::delete(&mut conn, created.get_id()).unwrap());
    assert_eq!(
        GlucoseMeasurement::by_id(&mut conn, created.get_id()).unwrap(),
        None
    );
}

#[test]
#[ignore]
fn updating_a_missing_measurement_is_not_found() {
    let mut conn = connection();

    let update = UpdateGlucoseMeasurement::unchanged_for_id(GlucoseMeasurementId(-1));
    assert_eq!(
        update.update(&mut conn).unwrap_err(),
        diesel::result::Error::NotFound
    );
}

#[test]
#[ignore]
fn readings_are_bounded_by_the_window() {
    let mut conn = connection();

    new("store-window", 100, at(17, 23)).create(&mut conn).unwrap();
    new("store-window", 120, at(18, 0)).create(&mut conn).unwrap();
    new("store-window", 140, at(24, 23)).create(&mut conn).unwrap();
    new("store-window", 160, at(25, 0)).create(&mut conn).unwrap();
    new("store-other", 999, at(20, 12)).create(&mut conn).unwrap();

    let window = Window::week_ending(NaiveDate::from_ymd_opt(2024, 4, 24).unwrap());
    let mut readings =
        GlucoseMeasurement::readings_in(&mut conn, &window, Some("store-window")).unwrap();
    readings.sort_by_key(|reading| reading.tested_at);

    let values: Vec<i32> = readings.iter().map(|reading| reading.value).collect();
    assert_eq!(values, vec![120, 140]);
}

#[test]
#[ignore]
fn averages_from_the_store() {
    let mut conn = connection();

    for (day, value) in &[(20, 100), (21, 200), (22, 60)] {
        new("store-averages", *value, at(*day, 9))
            .create(&mut conn)
            .unwrap();
    }
    new("store-averages", 90, at(12, 9)).create(&mut conn).unwrap();

    let averages =
        analytics::glucose_averages(&mut conn, at(24, 0), Some("store-averages")).unwrap();
    assert_eq!(averages.weekly.average, Some(120.0));
    assert_eq!(averages.weekly.change, Some(30.0));
    assert_eq!(averages.weekly.change_percent, Some(33.3));
    assert_eq!(averages.weekly.time_below_range, Some(33.3));
    assert_eq!(averages.monthly.average, Some(112.5));
    assert_eq!(averages.monthly.change, None);
}
