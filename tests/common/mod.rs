#![allow(dead_code)]

use async_trait::async_trait;
use bccr_datahub::errors::{IndicatorError, Result};
use bccr_datahub::models::indicator::{
    BasicPassiveRate, CostaRicaInflationRate, ExchangeRate, MonetaryPolicyRate, PrimeRate,
    TreasuryRateUSA, USAInflationRate,
};
use bccr_datahub::repositories::Repository;
use bccr_datahub::scrapers::IndicatorScraper;
use bccr_datahub::util;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn fixed_today() -> NaiveDate {
    d(2024, 3, 10)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub filter: i64,
}

/// Scraper double: ranged calls return one record per year starting at `from`,
/// by-date calls return the value published for that date or a zero record.
#[derive(Default)]
pub struct MockScraper {
    pub calls: Mutex<Vec<Call>>,
    pub fail_from: Option<NaiveDate>,
    pub published: HashMap<NaiveDate, f64>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_from(mut self, date: NaiveDate) -> Self {
        self.fail_from = Some(date);
        self
    }

    pub fn publishing(mut self, date: NaiveDate, value: f64) -> Self {
        self.published.insert(date, value);
        self
    }

    pub fn calls(&self, method: &str) -> Vec<Call> {
        let mut calls: Vec<Call> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect();
        calls.sort_by_key(|c| (c.from, c.filter));
        calls
    }

    fn ranged(&self, method: &'static str, from: NaiveDate, to: NaiveDate, filter: i64) -> Result<Vec<(NaiveDate, f64)>> {
        self.calls.lock().unwrap().push(Call { method, from, to, filter });
        if self.fail_from == Some(from) {
            return Err(IndicatorError::SourceError(format!("connection reset for {}", from)));
        }
        let mut rows = Vec::new();
        let mut date = from;
        while date <= to {
            rows.push((date, filter as f64 + 1.0));
            let next = util::add_years(date, 1);
            if next <= date {
                break;
            }
            date = next;
        }
        Ok(rows)
    }

    fn by_date(&self, method: &'static str, date: NaiveDate) -> (NaiveDate, f64) {
        self.calls.lock().unwrap().push(Call { method, from: date, to: date, filter: 0 });
        (date, self.published.get(&date).copied().unwrap_or(0.0))
    }
}

#[async_trait]
impl IndicatorScraper for MockScraper {
    fn source_name(&self) -> &'static str {
        "mock"
    }

    async fn exchange_rates(&self, from: NaiveDate, to: NaiveDate, filter: i64) -> Result<Vec<ExchangeRate>> {
        Ok(self
            .ranged("exchange_rates", from, to, filter)?
            .into_iter()
            .map(|(date, v)| ExchangeRate::new(date, v, v + 5.0))
            .collect())
    }

    async fn exchange_rate(&self, date: NaiveDate) -> Result<Option<ExchangeRate>> {
        let (date, v) = self.by_date("exchange_rate", date);
        Ok(Some(ExchangeRate::new(date, v, if v == 0.0 { 0.0 } else { v + 5.0 })))
    }

    async fn basic_passive_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BasicPassiveRate>> {
        Ok(self
            .ranged("basic_passive_rates", from, to, 0)?
            .into_iter()
            .map(|(date, v)| BasicPassiveRate::new(date, v))
            .collect())
    }

    async fn basic_passive_rate(&self, date: NaiveDate) -> Result<Option<BasicPassiveRate>> {
        let (date, v) = self.by_date("basic_passive_rate", date);
        Ok(Some(BasicPassiveRate::new(date, v)))
    }

    async fn monetary_policy_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<MonetaryPolicyRate>> {
        Ok(self
            .ranged("monetary_policy_rates", from, to, 0)?
            .into_iter()
            .map(|(date, v)| MonetaryPolicyRate::new(date, v))
            .collect())
    }

    async fn monetary_policy_rate(&self, date: NaiveDate) -> Result<Option<MonetaryPolicyRate>> {
        let (date, v) = self.by_date("monetary_policy_rate", date);
        Ok(Some(MonetaryPolicyRate::new(date, v)))
    }

    async fn prime_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<PrimeRate>> {
        Ok(self
            .ranged("prime_rates", from, to, 0)?
            .into_iter()
            .map(|(date, v)| PrimeRate::new(date, v))
            .collect())
    }

    async fn prime_rate(&self, date: NaiveDate) -> Result<Option<PrimeRate>> {
        let (date, v) = self.by_date("prime_rate", date);
        Ok(Some(PrimeRate::new(date, v)))
    }

    async fn costa_rica_inflation_rates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        filter: i64,
    ) -> Result<Vec<CostaRicaInflationRate>> {
        Ok(self
            .ranged("costa_rica_inflation_rates", from, to, filter)?
            .into_iter()
            .map(|(date, v)| CostaRicaInflationRate::new(date, v))
            .collect())
    }

    async fn costa_rica_inflation_rate(&self, date: NaiveDate) -> Result<Option<CostaRicaInflationRate>> {
        let (date, v) = self.by_date("costa_rica_inflation_rate", date);
        Ok(Some(CostaRicaInflationRate::new(date, v)))
    }

    async fn treasury_rates_usa(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TreasuryRateUSA>> {
        Ok(self
            .ranged("treasury_rates_usa", from, to, 0)?
            .into_iter()
            .map(|(date, v)| TreasuryRateUSA::new(date, v))
            .collect())
    }

    async fn treasury_rate_usa(&self, date: NaiveDate) -> Result<Option<TreasuryRateUSA>> {
        let (date, v) = self.by_date("treasury_rate_usa", date);
        Ok(Some(TreasuryRateUSA::new(date, v)))
    }

    async fn usa_inflation_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<USAInflationRate>> {
        Ok(self
            .ranged("usa_inflation_rates", from, to, 0)?
            .into_iter()
            .map(|(date, v)| USAInflationRate::new(date, v))
            .collect())
    }

    async fn usa_inflation_rate(&self, date: NaiveDate) -> Result<Option<USAInflationRate>> {
        self.calls.lock().unwrap().push(Call { method: "usa_inflation_rate", from: date, to: date, filter: 0 });
        Ok(self.published.get(&date).map(|v| USAInflationRate::new(date, *v)))
    }
}

#[derive(Default)]
pub struct MockRepository {
    pub saved: Mutex<Vec<ExchangeRate>>,
    pub fail: bool,
}

#[async_trait]
impl Repository for MockRepository {
    async fn save_latest_exchange_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate> {
        if self.fail {
            return Err(IndicatorError::Unknown("duplicate key value".to_string()));
        }
        self.saved.lock().unwrap().push(rate.clone());
        Ok(rate)
    }

    async fn exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        Ok(self.saved.lock().unwrap().clone())
    }
}
