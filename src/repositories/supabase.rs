use crate::config::Config;
use crate::errors::{IndicatorError, Result};
use crate::models::indicator::ExchangeRate;
use crate::repositories::base::Repository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, error, info};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Deserializer};

const EXCHANGE_RATES_TABLE: &str = "exchange_rates";

/// Row as PostgREST returns it. The `date` column may be a `date` or a
/// `timestamp`/`timestamptz`, so both shapes are accepted.
#[derive(Debug, Deserialize)]
struct StoredExchangeRate {
    buy: f64,
    sale: f64,
    #[serde(deserialize_with = "stored_date")]
    date: NaiveDate,
}

impl From<StoredExchangeRate> for ExchangeRate {
    fn from(row: StoredExchangeRate) -> Self {
        ExchangeRate::new(row.date, row.buy, row.sale)
    }
}

/// Parses "2024-03-10", "2024-03-10T00:00:00" or an RFC 3339 timestamp.
fn parse_stored_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|timestamp| timestamp.date())
}

fn stored_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_stored_date(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised stored date {:?}", value)))
}

/// Supabase table storage through its PostgREST endpoint.
pub struct SupabaseRepository {
    client: Client,
    url: String,
    key: String,
}

impl SupabaseRepository {
    /// Creates a client for the project at `url`, authenticating with `key`.
    pub fn new(url: &str, key: &str) -> Result<Self> {
        let client = Client::builder().build().map_err(IndicatorError::RequestError)?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    /// Builds a repository when both `SUPABASE_URL` and `SUPABASE_KEY` are configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        match (&config.supabase_url, &config.supabase_key) {
            (Some(url), Some(key)) => Ok(Some(Self::new(url, key)?)),
            _ => Ok(None),
        }
    }

    /// PostgREST endpoint of `table`.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

#[async_trait]
impl Repository for SupabaseRepository {
    async fn save_latest_exchange_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate> {
        debug!("Saving exchange rate for {}", rate.date);
        let request = self
            .authorized(self.client.post(self.table_url(EXCHANGE_RATES_TABLE)))
            .header("Prefer", "return=representation")
            .json(&rate);

        let response = request.send().await.map_err(|e| {
            error!("Failed to reach Supabase: {}", e);
            IndicatorError::PersistError(e.to_string())
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Supabase rejected exchange rate: {} {}", status, body);
            return Err(IndicatorError::PersistError(format!("{}: {}", status, body)));
        }

        let mut rows: Vec<StoredExchangeRate> = response
            .json()
            .await
            .map_err(|e| IndicatorError::PersistError(e.to_string()))?;
        if rows.is_empty() {
            return Err(IndicatorError::PersistError("insert returned no rows".to_string()));
        }
        info!("Saved exchange rate for {}", rate.date);
        Ok(rows.swap_remove(0).into())
    }

    async fn exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        let response = self
            .authorized(self.client.get(self.table_url(EXCHANGE_RATES_TABLE)))
            .query(&[("select", "*")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(IndicatorError::SourceError(format!(
                "Supabase returned status {}",
                response.status()
            )));
        }
        let rows: Vec<StoredExchangeRate> = response.json().await?;
        Ok(rows.into_iter().map(ExchangeRate::from).collect())
    }
}
