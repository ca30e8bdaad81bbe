pub mod aggregate;
pub mod indicator_service;
pub mod partition;
pub mod policy;
pub mod probe;

pub use indicator_service::{IndicatorService, IndicatorServiceTrait};
