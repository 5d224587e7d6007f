pub mod datetime;
pub mod tracing;
