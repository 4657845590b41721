//! Actual-consumption query endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use super::error::ApiError;
use crate::app::AppState;
use crate::domain::{ConsumptionRecord, ConsumptionStats};
use crate::repo::ConsumptionStore;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// GET /api/v1/consumption - ingested actuals for a time range.
pub async fn get_range(
    State(st): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Vec<ConsumptionRecord>>, ApiError> {
    if q.end < q.start {
        return Err(ApiError::BadRequest("end precedes start".to_string()));
    }
    let records = st.stores.consumption.by_range(q.start, q.end).await?;
    Ok(Json(records))
}

/// GET /api/v1/consumption/stats - ingestion dashboard summary.
pub async fn get_stats(State(st): State<AppState>) -> Result<Json<ConsumptionStats>, ApiError> {
    Ok(Json(st.syncer.stats().await?))
}
