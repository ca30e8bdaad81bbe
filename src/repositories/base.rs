use crate::errors::Result;
use crate::models::indicator::ExchangeRate;
use async_trait::async_trait;

/// Storage for scraped exchange rates.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stores `rate` and returns the stored row.
    async fn save_latest_exchange_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate>;

    async fn exchange_rates(&self) -> Result<Vec<ExchangeRate>>;
}
