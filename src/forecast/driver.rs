use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::lags::LagResolver;
use crate::domain::{ForecastHorizon, ForecastPoint, LagSet, ModelName, SimulationInput};
use crate::repo::{ConsumptionStore, ForecastStore};
use crate::scoring::ScoringGateway;

/// Hours the run must have progressed before the 1-hour lag switches from
/// historical data to the run's own previous prediction. The short warm-up
/// keeps very-early-horizon noise from compounding straight into the next
/// few hours.
pub const LAG_1H_WARMUP_HOURS: usize = 3;
pub const LAG_24H_OFFSET: usize = 24;
pub const LAG_168H_OFFSET: usize = 168;

/// Iterative multi-horizon forecaster.
///
/// Hours are scored strictly in increasing time order; each hour's
/// prediction lands in a run-scoped buffer before the next hour starts, so
/// later hours can consume earlier forecasts as lag inputs. The buffer is
/// owned by a single run and discarded with it; persistence happens only
/// through [`ForecastStore`] upserts.
pub struct ForecastDriver {
    resolver: LagResolver,
    forecasts: Arc<dyn ForecastStore>,
    scorer: Arc<dyn ScoringGateway>,
}

impl ForecastDriver {
    pub fn new(
        consumption: Arc<dyn ConsumptionStore>,
        forecasts: Arc<dyn ForecastStore>,
        scorer: Arc<dyn ScoringGateway>,
    ) -> Self {
        Self {
            resolver: LagResolver::new(consumption),
            forecasts,
            scorer,
        }
    }

    /// Score every hour of the horizon and persist each point as it lands.
    ///
    /// A scoring or store failure aborts the run at that hour; points
    /// already upserted stay valid, and a retried run overwrites them
    /// idempotently.
    pub async fn run(
        &self,
        horizon: &ForecastHorizon,
        model: ModelName,
    ) -> Result<Vec<ForecastPoint>> {
        let mut results: Vec<ForecastPoint> = Vec::with_capacity(horizon.len());
        let mut previous: Vec<f64> = Vec::with_capacity(horizon.len());

        for step in horizon.steps() {
            // Always resolved, even when every component gets overridden:
            // the historical base is the fallback that keeps the lag set
            // fully populated.
            let base = self.resolver.resolve(step.target).await?;
            let lags = effective_lags(base, &previous, step.index);

            debug!(index = step.index, target = %step.target, ?lags, "scoring horizon hour");

            let predicted = self
                .scorer
                .predict(step.target, &step.weather, lags, model)
                .await
                .with_context(|| {
                    format!("scoring failed at horizon hour {} ({})", step.index, step.target)
                })?;

            previous.push(predicted);

            let point = ForecastPoint {
                target_datetime: step.target,
                model,
                predicted_mwh: predicted,
                weather: step.weather.clone(),
            };
            self.forecasts.upsert(&point).await?;
            results.push(point);
        }

        info!(hours = results.len(), %model, "forecast run complete");
        Ok(results)
    }

    /// One-shot what-if prediction with caller-supplied weather and lags.
    ///
    /// Bypasses the lag resolver and the previous-predictions buffer, and
    /// never persists the result.
    pub async fn simulate(&self, input: &SimulationInput) -> Result<ForecastPoint> {
        let predicted = self
            .scorer
            .predict(input.datetime, &input.weather, input.lags, input.model)
            .await
            .context("simulation scoring failed")?;

        Ok(ForecastPoint {
            target_datetime: input.datetime,
            model: input.model,
            predicted_mwh: predicted,
            weather: input.weather.clone(),
        })
    }
}

/// Per-component lag override policy.
///
/// Each component independently prefers the forecast generated earlier in
/// this run once the horizon has advanced past its threshold. With the
/// default 168-hour horizon the weekly condition `index >= 168` is out of
/// reach, so `lag_168h` always stays historical in a standard run; that is
/// long-standing, intentional behavior (longer horizons would activate it).
fn effective_lags(base: LagSet, previous: &[f64], index: usize) -> LagSet {
    let lag_1h = if index >= LAG_1H_WARMUP_HOURS {
        previous.get(index - 1).copied().unwrap_or(base.lag_1h)
    } else {
        base.lag_1h
    };

    let lag_24h = if index >= LAG_24H_OFFSET {
        previous.get(index - LAG_24H_OFFSET).copied().unwrap_or(base.lag_24h)
    } else {
        base.lag_24h
    };

    let lag_168h = if index >= LAG_168H_OFFSET {
        previous
            .get(index - LAG_168H_OFFSET)
            .copied()
            .unwrap_or(base.lag_168h)
    } else {
        base.lag_168h
    };

    LagSet {
        lag_1h,
        lag_24h,
        lag_168h,
    }
}
