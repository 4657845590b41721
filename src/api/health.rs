use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::app::AppState;
use crate::repo::ConsumptionStore;
use crate::scoring::ScoringGateway;

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    scoring: ComponentHealth,
    history: ComponentHealth,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            error: Some(error),
        }
    }
}

/// GET /health - the service plus its two critical dependencies: the
/// scoring API and the consumption history backing the lag resolver.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let scoring = if state.scorer.health().await {
        ComponentHealth::healthy()
    } else {
        ComponentHealth::unhealthy("scoring service unreachable".to_string())
    };

    let history = match state.stores.consumption.count().await {
        Ok(_) => ComponentHealth::healthy(),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    let all_healthy = scoring.status == "healthy" && history.status == "healthy";

    let response = HealthResponse {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        timestamp: chrono::Utc::now(),
        checks: HealthChecks { scoring, history },
    };

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
