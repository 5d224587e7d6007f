use crate::models;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct GlucoseMeasurement {
    pub id: i32,
    pub subject_id: String,
    pub value: i32,
    pub tested_at: NaiveDateTime,
    pub tz_offset: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<models::GlucoseMeasurement> for GlucoseMeasurement {
    fn from(glucose_measurement: models::GlucoseMeasurement) -> Self {
        let models::GlucoseMeasurement {
            id,
            subject_id,
            value,
            tested_at,
            tz_offset,
            created_at,
            updated_at,
        } = glucose_measurement;
        Self {
            id,
            subject_id,
            value,
            tested_at,
            tz_offset,
            created_at,
            updated_at,
        }
    }
}
