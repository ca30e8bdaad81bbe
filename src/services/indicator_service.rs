use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{error, info};
use std::sync::Arc;

use crate::errors::{IndicatorError, Result};
use crate::models::date_range::DateRange;
use crate::models::indicator::{
    BasicPassiveRate, CostaRicaInflationRate, ExchangeRate, MonetaryPolicyRate, Observation,
    Periodicity, PeriodicityRequest, PrimeRate, RangeRequest, TreasuryRateUSA, USAInflationRate,
};
use crate::repositories::Repository;
use crate::scrapers::base::NO_FILTER;
use crate::scrapers::IndicatorScraper;
use crate::services::aggregate::{every_nth, scatter_gather, sort_by_date_desc, ScrapeJob};
use crate::services::partition::partition;
use crate::services::policy::{IndicatorKind, QUINQUENNIUM_STRIDE};
use crate::services::probe::probe_latest;
use crate::util;

pub type SharedScraper = Arc<dyn IndicatorScraper + Send + Sync>;
pub type SharedRepository = Arc<dyn Repository + Send + Sync>;

/// Query operations exposed to the transport layer, one pair per indicator.
#[async_trait]
pub trait IndicatorServiceTrait: Send + Sync {
    async fn exchange_rates(&self, request: RangeRequest) -> Result<Vec<ExchangeRate>>;
    async fn exchange_rates_by_periodicity(&self, request: PeriodicityRequest) -> Result<Vec<ExchangeRate>>;
    async fn today_exchange_rate(&self) -> Result<ExchangeRate>;
    /// Probes today's exchange rate and stores it; the scraped value is only returned once stored.
    async fn save_today_exchange_rate(&self) -> Result<ExchangeRate>;
    async fn stored_exchange_rates(&self) -> Result<Vec<ExchangeRate>>;

    async fn basic_passive_rates(&self, request: RangeRequest) -> Result<Vec<BasicPassiveRate>>;
    async fn today_basic_passive_rate(&self) -> Result<BasicPassiveRate>;

    async fn monetary_policy_rates(&self, request: RangeRequest) -> Result<Vec<MonetaryPolicyRate>>;
    async fn today_monetary_policy_rate(&self) -> Result<MonetaryPolicyRate>;

    async fn prime_rates(&self, request: RangeRequest) -> Result<Vec<PrimeRate>>;
    async fn today_prime_rate(&self) -> Result<PrimeRate>;

    async fn costa_rica_inflation_rates(&self, request: RangeRequest) -> Result<Vec<CostaRicaInflationRate>>;
    async fn costa_rica_inflation_rates_by_periodicity(
        &self,
        request: PeriodicityRequest,
    ) -> Result<Vec<CostaRicaInflationRate>>;
    async fn today_costa_rica_inflation_rate(&self) -> Result<CostaRicaInflationRate>;

    async fn treasury_rates_usa(&self, request: RangeRequest) -> Result<Vec<TreasuryRateUSA>>;
    async fn today_treasury_rate_usa(&self) -> Result<TreasuryRateUSA>;

    async fn usa_inflation_rates(&self, request: RangeRequest) -> Result<Vec<USAInflationRate>>;
    async fn today_usa_inflation_rate(&self) -> Result<USAInflationRate>;

    /// Current date the probes start from.
    fn today(&self) -> NaiveDate;
}

pub struct IndicatorService {
    scraper: SharedScraper,
    repository: Option<SharedRepository>,
    today: fn() -> NaiveDate,
}

impl IndicatorService {
    /// Service without persistence; `save_today_exchange_rate` fails until a repository is attached.
    pub fn new(scraper: SharedScraper) -> Self {
        Self {
            scraper,
            repository: None,
            today: util::today,
        }
    }

    /// Attaches the store used by the persisting operations.
    pub fn with_repository(mut self, repository: SharedRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Overrides the clock; the default is the current date in Costa Rica.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Partitions the request, scrapes every sub-range concurrently and sorts the merge.
    async fn ranged<T, F>(&self, kind: IndicatorKind, request: RangeRequest, fetch: F) -> Result<Vec<T>>
    where
        T: Observation,
        F: Fn(SharedScraper, NaiveDate, NaiveDate) -> BoxFuture<'static, Result<Vec<T>>>,
    {
        let ranges = partition(request.date_from, request.date_to, kind.partition_rule())?;
        info!(
            "Scraping {} {} from {} in {} units",
            kind,
            DateRange { from: request.date_from, to: request.date_to },
            self.scraper.source_name(),
            ranges.len()
        );
        let jobs = ranges
            .into_iter()
            .map(|range| ScrapeJob::new(range.to_string(), fetch(self.scraper.clone(), range.from, range.to)))
            .collect();

        let mut records = scatter_gather(kind.name(), jobs).await?;
        sort_by_date_desc(&mut records);
        Ok(records)
    }

    /// One unit per (era, filter code) pair; quinquennium keeps every fifth sorted record.
    async fn by_periodicity<T, F>(&self, kind: IndicatorKind, request: PeriodicityRequest, fetch: F) -> Result<Vec<T>>
    where
        T: Observation,
        F: Fn(SharedScraper, NaiveDate, NaiveDate, i64) -> BoxFuture<'static, Result<Vec<T>>>,
    {
        let codes = kind.filter_codes(request.periodicity)?;
        let eras = kind.eras((self.today)())?;

        info!(
            "Scraping {} {} from {} over {} eras and {} filter codes",
            kind,
            request.periodicity,
            self.scraper.source_name(),
            eras.len(),
            codes.len()
        );
        let mut jobs = Vec::with_capacity(codes.len() * eras.len());
        for era in &eras {
            for &code in codes {
                jobs.push(ScrapeJob::new(
                    format!("{} filter {}", era, code),
                    fetch(self.scraper.clone(), era.from, era.to, code),
                ));
            }
        }

        let mut records = scatter_gather(kind.name(), jobs).await?;
        sort_by_date_desc(&mut records);
        if request.periodicity == Periodicity::Quinquennium {
            records = every_nth(records, QUINQUENNIUM_STRIDE);
        }
        Ok(records)
    }

    async fn latest<T, F>(&self, kind: IndicatorKind, fetch: F) -> Result<T>
    where
        T: Observation,
        F: Fn(SharedScraper, NaiveDate) -> BoxFuture<'static, Result<Option<T>>>,
    {
        let scraper = &self.scraper;
        probe_latest(kind.name(), (self.today)(), kind.probe_policy(), |date| {
            fetch(scraper.clone(), date)
        })
        .await
    }
}

#[async_trait]
impl IndicatorServiceTrait for IndicatorService {
    async fn exchange_rates(&self, request: RangeRequest) -> Result<Vec<ExchangeRate>> {
        self.ranged(IndicatorKind::ExchangeRate, request, |s, from, to| {
            async move { s.exchange_rates(from, to, NO_FILTER).await }.boxed()
        })
        .await
    }

    async fn exchange_rates_by_periodicity(&self, request: PeriodicityRequest) -> Result<Vec<ExchangeRate>> {
        self.by_periodicity(IndicatorKind::ExchangeRate, request, |s, from, to, filter| {
            async move { s.exchange_rates(from, to, filter).await }.boxed()
        })
        .await
    }

    async fn today_exchange_rate(&self) -> Result<ExchangeRate> {
        self.latest(IndicatorKind::ExchangeRate, |s, date| {
            async move { s.exchange_rate(date).await }.boxed()
        })
        .await
    }

    async fn save_today_exchange_rate(&self) -> Result<ExchangeRate> {
        let repository = self
            .repository
            .as_ref()
            .ok_or_else(|| IndicatorError::ConfigError("no repository configured".to_string()))?;

        let rate = self.today_exchange_rate().await?;
        match repository.save_latest_exchange_rate(rate).await {
            Ok(saved) => {
                info!("Stored exchange rate for {}", saved.date);
                Ok(saved)
            }
            Err(e) => {
                error!("Failed to store today's exchange rate: {}", e);
                Err(match e {
                    IndicatorError::PersistError(_) => e,
                    other => IndicatorError::PersistError(other.to_string()),
                })
            }
        }
    }

    async fn stored_exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        let repository = self
            .repository
            .as_ref()
            .ok_or_else(|| IndicatorError::ConfigError("no repository configured".to_string()))?;
        let mut rates = repository.exchange_rates().await?;
        sort_by_date_desc(&mut rates);
        Ok(rates)
    }

    async fn basic_passive_rates(&self, request: RangeRequest) -> Result<Vec<BasicPassiveRate>> {
        self.ranged(IndicatorKind::BasicPassiveRate, request, |s, from, to| {
            async move { s.basic_passive_rates(from, to).await }.boxed()
        })
        .await
    }

    async fn today_basic_passive_rate(&self) -> Result<BasicPassiveRate> {
        self.latest(IndicatorKind::BasicPassiveRate, |s, date| {
            async move { s.basic_passive_rate(date).await }.boxed()
        })
        .await
    }

    async fn monetary_policy_rates(&self, request: RangeRequest) -> Result<Vec<MonetaryPolicyRate>> {
        self.ranged(IndicatorKind::MonetaryPolicyRate, request, |s, from, to| {
            async move { s.monetary_policy_rates(from, to).await }.boxed()
        })
        .await
    }

    async fn today_monetary_policy_rate(&self) -> Result<MonetaryPolicyRate> {
        self.latest(IndicatorKind::MonetaryPolicyRate, |s, date| {
            async move { s.monetary_policy_rate(date).await }.boxed()
        })
        .await
    }

    async fn prime_rates(&self, request: RangeRequest) -> Result<Vec<PrimeRate>> {
        self.ranged(IndicatorKind::PrimeRate, request, |s, from, to| {
            async move { s.prime_rates(from, to).await }.boxed()
        })
        .await
    }

    async fn today_prime_rate(&self) -> Result<PrimeRate> {
        self.latest(IndicatorKind::PrimeRate, |s, date| {
            async move { s.prime_rate(date).await }.boxed()
        })
        .await
    }

    async fn costa_rica_inflation_rates(&self, request: RangeRequest) -> Result<Vec<CostaRicaInflationRate>> {
        self.ranged(IndicatorKind::CostaRicaInflationRate, request, |s, from, to| {
            async move { s.costa_rica_inflation_rates(from, to, NO_FILTER).await }.boxed()
        })
        .await
    }

    async fn costa_rica_inflation_rates_by_periodicity(
        &self,
        request: PeriodicityRequest,
    ) -> Result<Vec<CostaRicaInflationRate>> {
        self.by_periodicity(IndicatorKind::CostaRicaInflationRate, request, |s, from, to, filter| {
            async move { s.costa_rica_inflation_rates(from, to, filter).await }.boxed()
        })
        .await
    }

    async fn today_costa_rica_inflation_rate(&self) -> Result<CostaRicaInflationRate> {
        self.latest(IndicatorKind::CostaRicaInflationRate, |s, date| {
            async move { s.costa_rica_inflation_rate(date).await }.boxed()
        })
        .await
    }

    async fn treasury_rates_usa(&self, request: RangeRequest) -> Result<Vec<TreasuryRateUSA>> {
        self.ranged(IndicatorKind::TreasuryRateUSA, request, |s, from, to| {
            async move { s.treasury_rates_usa(from, to).await }.boxed()
        })
        .await
    }

    async fn today_treasury_rate_usa(&self) -> Result<TreasuryRateUSA> {
        self.latest(IndicatorKind::TreasuryRateUSA, |s, date| {
            async move { s.treasury_rate_usa(date).await }.boxed()
        })
        .await
    }

    async fn usa_inflation_rates(&self, request: RangeRequest) -> Result<Vec<USAInflationRate>> {
        self.ranged(IndicatorKind::USAInflationRate, request, |s, from, to| {
            async move { s.usa_inflation_rates(from, to).await }.boxed()
        })
        .await
    }

    async fn today_usa_inflation_rate(&self) -> Result<USAInflationRate> {
        self.latest(IndicatorKind::USAInflationRate, |s, date| {
            async move { s.usa_inflation_rate(date).await }.boxed()
        })
        .await
    }

    fn today(&self) -> NaiveDate {
        (self.today)()
    }
}
