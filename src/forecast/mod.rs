//! Demand forecasting port. The prediction procedure itself runs outside this
//! service; we only depend on its result contract.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Forecasting service is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemForecast {
    pub item_name: String,
    pub predicted_demand: f64,
}

#[async_trait]
pub trait DemandForecaster: Send + Sync {
    /// Predicted per-item demand over the next `horizon_days` days.
    async fn forecast(&self, horizon_days: u32) -> Result<Vec<ItemForecast>, ForecastError>;
}

/// Forecaster backed by an external HTTP prediction service.
#[derive(Clone)]
pub struct HttpForecaster {
    client: Client,
    base_url: Option<String>,
}

impl HttpForecaster {
    pub fn new(base_url: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        HttpForecaster { client, base_url }
    }
}

#[async_trait]
impl DemandForecaster for HttpForecaster {
    async fn forecast(&self, horizon_days: u32) -> Result<Vec<ItemForecast>, ForecastError> {
        let base = self.base_url.as_deref().ok_or(ForecastError::NotConfigured)?;
        let url = format!("{}/predict?days={}", base.trim_end_matches('/'), horizon_days);

        let response = self.client.get(&url).send().await?;
        let forecasts = response
            .error_for_status()?
            .json::<Vec<ItemForecast>>()
            .await?;
        Ok(forecasts)
    }
}
