//! Scheduled trigger endpoints.
//!
//! Both run hourly behind an external scheduler; a failed run reports 500
//! and the next tick retries naturally, with upserts keeping re-runs safe.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::error::ApiError;
use crate::app::AppState;
use crate::auth::CronAuth;

#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub success: bool,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/cron/sync-predictions
///
/// Runs the iterative engine over the configured horizon with the default
/// model. Points persisted before a mid-run failure stay in place.
pub async fn sync_predictions(
    State(st): State<AppState>,
    _auth: CronAuth,
) -> Result<Json<SyncSummary>, ApiError> {
    let horizon_hours = st.cfg.forecast.horizon_hours;
    let model = st.cfg.forecast.default_model;

    info!(horizon_hours, %model, "prediction sync triggered");
    let points = st.engine.generate(horizon_hours, model).await?;

    Ok(Json(SyncSummary {
        success: true,
        count: points.len(),
        timestamp: Utc::now(),
    }))
}

/// POST /api/v1/cron/sync-consumption
pub async fn sync_consumption(
    State(st): State<AppState>,
    _auth: CronAuth,
) -> Result<Json<SyncSummary>, ApiError> {
    info!("consumption sync triggered");
    let synced = st.syncer.sync_recent(Utc::now().fixed_offset()).await?;

    Ok(Json(SyncSummary {
        success: true,
        count: synced,
        timestamp: Utc::now(),
    }))
}
