mod glucose_measurement;
pub use glucose_measurement::{
    GlucoseMeasurement, GlucoseMeasurementId, NewGlucoseMeasurement, UpdateGlucoseMeasurement,
};
