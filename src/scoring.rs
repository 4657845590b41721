//! Client for the external model-serving API.
//!
//! The service hosts the trained gradient-boosting models and exposes a
//! single point-prediction endpoint; this module treats it as a black box
//! behind the [`ScoringGateway`] trait.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{LagSet, ModelName, WeatherSnapshot};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringGateway: Send + Sync {
    /// Score one target hour. Identical inputs are expected to yield the
    /// same prediction, which is what makes horizon re-runs reproducible.
    async fn predict(
        &self,
        datetime: DateTime<FixedOffset>,
        weather: &WeatherSnapshot,
        lags: LagSet,
        model: ModelName,
    ) -> Result<f64>;

    async fn models(&self) -> Result<AvailableModels>;

    async fn health(&self) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableModels {
    pub models: Vec<String>,
    pub default: String,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    datetime: DateTime<FixedOffset>,
    weather: &'a WeatherSnapshot,
    lags: LagSet,
    model: ModelName,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    prediction: f64,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[allow(dead_code)]
    status: String,
}

pub struct HttpScoringGateway {
    base_url: String,
    client: Client,
}

impl HttpScoringGateway {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ScoringGateway for HttpScoringGateway {
    async fn predict(
        &self,
        datetime: DateTime<FixedOffset>,
        weather: &WeatherSnapshot,
        lags: LagSet,
        model: ModelName,
    ) -> Result<f64> {
        let request = ScoreRequest {
            datetime,
            weather,
            lags,
            model,
        };

        debug!(%datetime, %model, "requesting prediction");

        let resp = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&request)
            .send()
            .await
            .context("scoring request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("scoring API error: HTTP {status}: {body}");
        }

        let scored: ScoreResponse = resp
            .json()
            .await
            .context("scoring response parse failed")?;
        Ok(scored.prediction)
    }

    async fn models(&self) -> Result<AvailableModels> {
        let resp = self
            .client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .context("models request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("models API error: HTTP {}", resp.status());
        }

        resp.json().await.context("models response parse failed")
    }

    async fn health(&self) -> bool {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => r.json::<HealthResponse>().await.is_ok(),
            _ => false,
        }
    }
}
