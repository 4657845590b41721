//! Forecast query and simulation endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use validator::Validate;

use super::error::ApiError;
use crate::app::AppState;
use crate::domain::{ForecastPoint, HourlyComparison, ModelName, SimulationInput};
use crate::repo::{ConsumptionStore, ForecastStore};
use crate::scoring::{AvailableModels, ScoringGateway};

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub model: Option<ModelName>,
}

/// GET /api/v1/predictions - stored forecasts joined with actuals.
pub async fn get_range(
    State(st): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Vec<HourlyComparison>>, ApiError> {
    if q.end < q.start {
        return Err(ApiError::BadRequest("end precedes start".to_string()));
    }

    let stored = st.stores.forecasts.by_range(q.start, q.end, q.model).await?;
    let actuals = st.stores.consumption.by_range(q.start, q.end).await?;

    let actual_by_hour: HashMap<DateTime<FixedOffset>, f64> = actuals
        .into_iter()
        .map(|r| (r.datetime, r.consumption_mwh))
        .collect();

    let comparison = stored
        .into_iter()
        .map(|p| HourlyComparison {
            datetime: p.target_datetime,
            predicted_mwh: p.predicted_mwh,
            actual_mwh: actual_by_hour.get(&p.target_datetime).copied(),
            model: p.model,
        })
        .collect();

    Ok(Json(comparison))
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub hours: Option<u32>,
    pub model: Option<ModelName>,
}

/// GET /api/v1/predictions/latest - forecasts for the next N hours.
pub async fn get_latest(
    State(st): State<AppState>,
    Query(q): Query<LatestQuery>,
) -> Result<Json<Vec<ForecastPoint>>, ApiError> {
    let hours = q.hours.unwrap_or(st.cfg.forecast.horizon_hours);
    let points = st
        .stores
        .forecasts
        .upcoming(Utc::now().fixed_offset(), hours, q.model)
        .await?;
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    pub datetime: DateTime<FixedOffset>,
    #[serde(default)]
    pub model: ModelName,
}

/// GET /api/v1/predictions/at - single stored forecast.
pub async fn get_one(
    State(st): State<AppState>,
    Query(q): Query<PointQuery>,
) -> Result<Json<ForecastPoint>, ApiError> {
    st.stores
        .forecasts
        .get_one(q.datetime, q.model)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!("no {} forecast for {}", q.model, q.datetime))
        })
}

/// POST /api/v1/simulate - one-shot what-if prediction, never persisted.
pub async fn simulate(
    State(st): State<AppState>,
    Json(input): Json<SimulationInput>,
) -> Result<Json<ForecastPoint>, ApiError> {
    input.validate()?;
    let point = st.engine.simulate(&input).await?;
    Ok(Json(point))
}

/// GET /api/v1/models - catalogue of the scoring service.
pub async fn list_models(
    State(st): State<AppState>,
) -> Result<Json<AvailableModels>, ApiError> {
    Ok(Json(st.scorer.models().await?))
}
