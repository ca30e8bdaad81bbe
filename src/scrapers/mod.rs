pub mod base;
pub mod bccr;

pub use base::IndicatorScraper;
pub use bccr::BccrScraper;
