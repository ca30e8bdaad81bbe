use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Scrape task error: {0}")]
    TaskError(String),

    #[error("no results found")]
    NotFound,

    #[error("Persist error: {0}")]
    PersistError(String),

    #[error("invalid date format. Should be in format: YYYY/MM/DD")]
    InvalidDateFormat,

    #[error("invalid date range")]
    InvalidDateRange,

    #[error("periodicity not supported: {0}")]
    UnsupportedPeriodicity(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl IndicatorError {
    /// HTTP status the transport layer reports for this error
    pub fn status_code(&self) -> u16 {
        match self {
            IndicatorError::NotFound => 404,
            IndicatorError::InvalidDateFormat
            | IndicatorError::InvalidDateRange
            | IndicatorError::UnsupportedPeriodicity(_) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndicatorError>;

impl From<String> for IndicatorError {
    fn from(s: String) -> Self {
        IndicatorError::Unknown(s)
    }
}

impl From<&str> for IndicatorError {
    fn from(s: &str) -> Self {
        IndicatorError::Unknown(s.to_string())
    }
}
