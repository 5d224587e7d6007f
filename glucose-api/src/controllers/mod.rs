pub mod analytics;
pub mod glucose_measurement;
