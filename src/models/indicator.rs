use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{IndicatorError, Result};

/// A dated observation of one indicator.
pub trait Observation: Send + 'static {
    fn date(&self) -> NaiveDate;

    /// Zero values are what the sources print when nothing was published for a date.
    fn is_blank(&self) -> bool;
}

/// Colón/dollar reference rate (BCCR table 400)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(rename = "buy")]
    pub buy_price: f64,
    #[serde(rename = "sale")]
    pub sale_price: f64,
    pub date: NaiveDate,
}

impl Observation for ExchangeRate {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn is_blank(&self) -> bool {
        self.buy_price == 0.0 || self.sale_price == 0.0
    }
}

macro_rules! single_value_indicator {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub value: f64,
            pub date: NaiveDate,
        }

        impl $name {
            pub fn new(date: NaiveDate, value: f64) -> Self {
                Self { value, date }
            }
        }

        impl Observation for $name {
            fn date(&self) -> NaiveDate {
                self.date
            }

            fn is_blank(&self) -> bool {
                self.value == 0.0
            }
        }
    };
}

single_value_indicator!(
    /// Tasa básica pasiva (BCCR table 17)
    BasicPassiveRate
);
single_value_indicator!(
    /// Tasa de política monetaria (BCCR table 779)
    MonetaryPolicyRate
);
single_value_indicator!(
    /// USA prime rate (BCCR table 60)
    PrimeRate
);
single_value_indicator!(
    /// Interannual CPI variation for Costa Rica (BCCR table 2732)
    CostaRicaInflationRate
);
single_value_indicator!(
    /// Interannual CPI variation for the USA
    USAInflationRate
);
single_value_indicator!(
    /// USA treasury rate (BCCR table 677)
    TreasuryRateUSA
);

impl ExchangeRate {
    pub fn new(date: NaiveDate, buy_price: f64, sale_price: f64) -> Self {
        Self {
            buy_price,
            sale_price,
            date,
        }
    }
}

/// Sampling mode for the filter-code queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Monthly,
    Quarterly,
    Biannual,
    Annual,
    Quinquennium,
}

impl FromStr for Periodicity {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Periodicity::Monthly),
            "quarterly" => Ok(Periodicity::Quarterly),
            "biannual" => Ok(Periodicity::Biannual),
            "annual" => Ok(Periodicity::Annual),
            "quinquennium" => Ok(Periodicity::Quinquennium),
            other => Err(IndicatorError::UnsupportedPeriodicity(other.to_string())),
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Periodicity::Monthly => "monthly",
            Periodicity::Quarterly => "quarterly",
            Periodicity::Biannual => "biannual",
            Periodicity::Annual => "annual",
            Periodicity::Quinquennium => "quinquennium",
        };
        f.write_str(name)
    }
}

/// Ranged query, already validated by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicityRequest {
    pub periodicity: Periodicity,
}

/// JSON envelope returned for every query: `{"data": ..., "error": "..."}`.
#[derive(Debug, Serialize)]
pub struct IndicatorResponse<T> {
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl<T> From<Result<T>> for IndicatorResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
                status: 200,
            },
            Err(e) => Self {
                data: None,
                status: e.status_code(),
                error: Some(e.to_string()),
            },
        }
    }
}
