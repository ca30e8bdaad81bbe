// Public modules
pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod scrapers;
pub mod services;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use errors::{IndicatorError, Result};
pub use scrapers::{BccrScraper, IndicatorScraper};
pub use services::{IndicatorService, IndicatorServiceTrait};
