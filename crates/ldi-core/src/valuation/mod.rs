pub mod schedule;
pub mod sensitivity;

pub use sensitivity::{dv01, modified_duration, value_schedule, ValuationResult};
