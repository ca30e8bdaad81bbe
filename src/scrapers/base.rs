use crate::errors::Result;
use crate::models::indicator::{
    BasicPassiveRate, CostaRicaInflationRate, ExchangeRate, MonetaryPolicyRate, PrimeRate,
    TreasuryRateUSA, USAInflationRate,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Filter code the BCCR tables use for "every published row".
pub const NO_FILTER: i64 = 0;

/// Fetches indicator tables from the upstream sources.
///
/// Ranged methods fetch one page covering `[from, to]`; callers split longer
/// intervals first. By-date methods return `None` when nothing was published
/// for that date.
#[async_trait]
pub trait IndicatorScraper: Send + Sync {
    /// Name of the upstream source, logged when a query is dispatched
    fn source_name(&self) -> &'static str;

    async fn exchange_rates(&self, from: NaiveDate, to: NaiveDate, filter: i64) -> Result<Vec<ExchangeRate>>;
    async fn exchange_rate(&self, date: NaiveDate) -> Result<Option<ExchangeRate>>;

    async fn basic_passive_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BasicPassiveRate>>;
    async fn basic_passive_rate(&self, date: NaiveDate) -> Result<Option<BasicPassiveRate>>;

    async fn monetary_policy_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<MonetaryPolicyRate>>;
    async fn monetary_policy_rate(&self, date: NaiveDate) -> Result<Option<MonetaryPolicyRate>>;

    async fn prime_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<PrimeRate>>;
    async fn prime_rate(&self, date: NaiveDate) -> Result<Option<PrimeRate>>;

    async fn costa_rica_inflation_rates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        filter: i64,
    ) -> Result<Vec<CostaRicaInflationRate>>;
    /// Rate for the calendar month before `date`, dated at that month's last day
    async fn costa_rica_inflation_rate(&self, date: NaiveDate) -> Result<Option<CostaRicaInflationRate>>;

    async fn treasury_rates_usa(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TreasuryRateUSA>>;
    /// Rate published for the day before `date`
    async fn treasury_rate_usa(&self, date: NaiveDate) -> Result<Option<TreasuryRateUSA>>;

    async fn usa_inflation_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<USAInflationRate>>;
    async fn usa_inflation_rate(&self, date: NaiveDate) -> Result<Option<USAInflationRate>>;
}
