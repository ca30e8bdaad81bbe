use chrono::NaiveDate;
use std::fmt;

use crate::errors::{IndicatorError, Result};
use crate::models::date_range::DateRange;
use crate::models::indicator::Periodicity;
use crate::services::partition::PartitionRule;
use crate::services::probe::ProbePolicy;

pub const MAXIMUM_TRIES: usize = 5;
pub const TREASURY_RATE_MAXIMUM_TRIES: usize = 30;
pub const BASIC_PASSIVE_RATE_YEARS: u32 = 12;
pub const MONETARY_POLICY_RATE_YEARS: u32 = 5;
pub const PRIME_RATE_YEARS: u32 = 9;
pub const COSTA_RICA_INFLATION_YEARS: u32 = 2;
pub const QUINQUENNIUM_STRIDE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    ExchangeRate,
    BasicPassiveRate,
    MonetaryPolicyRate,
    PrimeRate,
    CostaRicaInflationRate,
    USAInflationRate,
    TreasuryRateUSA,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::ExchangeRate,
        IndicatorKind::BasicPassiveRate,
        IndicatorKind::MonetaryPolicyRate,
        IndicatorKind::PrimeRate,
        IndicatorKind::CostaRicaInflationRate,
        IndicatorKind::USAInflationRate,
        IndicatorKind::TreasuryRateUSA,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::ExchangeRate => "exchange_rate",
            IndicatorKind::BasicPassiveRate => "basic_passive_rate",
            IndicatorKind::MonetaryPolicyRate => "monetary_policy_rate",
            IndicatorKind::PrimeRate => "prime_rate",
            IndicatorKind::CostaRicaInflationRate => "costa_rica_inflation_rate",
            IndicatorKind::USAInflationRate => "usa_inflation_rate",
            IndicatorKind::TreasuryRateUSA => "treasury_rate_usa",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// How the source paginates ranged queries.
    pub fn partition_rule(&self) -> PartitionRule {
        match self {
            IndicatorKind::ExchangeRate | IndicatorKind::TreasuryRateUSA => PartitionRule::Monthly,
            IndicatorKind::BasicPassiveRate => PartitionRule::YearWindow(BASIC_PASSIVE_RATE_YEARS),
            IndicatorKind::MonetaryPolicyRate => PartitionRule::YearWindow(MONETARY_POLICY_RATE_YEARS),
            IndicatorKind::PrimeRate => PartitionRule::YearWindow(PRIME_RATE_YEARS),
            IndicatorKind::CostaRicaInflationRate => PartitionRule::RollingYears(COSTA_RICA_INFLATION_YEARS),
            IndicatorKind::USAInflationRate => PartitionRule::Single,
        }
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        match self {
            IndicatorKind::TreasuryRateUSA => ProbePolicy::daily(TREASURY_RATE_MAXIMUM_TRIES),
            IndicatorKind::CostaRicaInflationRate | IndicatorKind::USAInflationRate => {
                ProbePolicy::monthly(MAXIMUM_TRIES)
            }
            _ => ProbePolicy::daily(MAXIMUM_TRIES),
        }
    }

    /// Filter codes queried for a periodicity; only the exchange rate and Costa Rica
    /// inflation tables accept them.
    pub fn filter_codes(&self, periodicity: Periodicity) -> Result<&'static [i64]> {
        let codes: &'static [i64] = match (self, periodicity) {
            (IndicatorKind::ExchangeRate, Periodicity::Quarterly) => &[31, 91, 182, 274, 366],
            (IndicatorKind::ExchangeRate, Periodicity::Biannual) => &[182, 366],
            (IndicatorKind::ExchangeRate, Periodicity::Annual | Periodicity::Quinquennium) => &[366],
            (IndicatorKind::CostaRicaInflationRate, Periodicity::Quarterly) => &[1, 3, 6, 9, 12],
            (IndicatorKind::CostaRicaInflationRate, Periodicity::Biannual) => &[6, 12],
            (IndicatorKind::CostaRicaInflationRate, Periodicity::Annual | Periodicity::Quinquennium) => &[12],
            _ => return Err(IndicatorError::UnsupportedPeriodicity(format!("{} for {}", periodicity, self))),
        };
        Ok(codes)
    }

    /// Historical eras a periodicity query is split into: `[first, bridge]` and `[bridge, today]`.
    pub fn eras(&self, today: NaiveDate) -> Result<Vec<DateRange>> {
        let (first, bridge) = match self {
            IndicatorKind::ExchangeRate => (ymd(1982, 12, 31), ymd(2002, 12, 1)),
            IndicatorKind::CostaRicaInflationRate => (ymd(1975, 12, 31), ymd(1994, 12, 1)),
            _ => return Err(IndicatorError::UnsupportedPeriodicity(format!("filters for {}", self))),
        };
        let mut eras = vec![DateRange { from: first, to: bridge }];
        if today > bridge {
            eras.push(DateRange { from: bridge, to: today });
        }
        Ok(eras)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
