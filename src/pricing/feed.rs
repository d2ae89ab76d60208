//! Exchange-rate lookup.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::schema::PricingConfig;
use crate::pricing::types::{PricingError, PricingResult};

/// Price of one unit of the chain's core token in the configured fiat currency.
#[async_trait]
pub trait ExchangeRateFeed: Send + Sync {
    async fn rate(&self) -> PricingResult<f64>;
}

/// CoinGecko `simple/price` client.
#[derive(Debug, Clone)]
pub struct CoinGeckoFeed {
    http: reqwest::Client,
    base_url: String,
    asset_id: String,
    currency: String,
}

impl CoinGeckoFeed {
    pub fn new(config: &PricingConfig) -> PricingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.feed_timeout_secs))
            .build()
            .map_err(|e| PricingError::Feed(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.feed_url.trim_end_matches('/').to_string(),
            asset_id: config.asset_id.clone(),
            currency: config.fiat_currency.to_lowercase(),
        })
    }

    /// Pull `body[asset][currency]` out of a `simple/price` response.
    fn extract_rate(&self, body: &Value) -> PricingResult<f64> {
        body.get(&self.asset_id)
            .and_then(|asset| asset.get(&self.currency))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                PricingError::Feed(format!("no {} price for {} in response", self.currency, self.asset_id))
            })
    }
}

#[async_trait]
impl ExchangeRateFeed for CoinGeckoFeed {
    async fn rate(&self) -> PricingResult<f64> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("ids", self.asset_id.as_str()), ("vs_currencies", self.currency.as_str())])
            .send()
            .await
            .map_err(|e| PricingError::Feed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::Feed(format!("feed answered {}", status)));
        }
        let body: Value = response.json().await.map_err(|e| PricingError::Feed(e.to_string()))?;
        let rate = self.extract_rate(&body)?;
        tracing::debug!(asset = %self.asset_id, currency = %self.currency, rate, "Exchange rate fetched");
        Ok(rate)
    }
}
