pub mod consumption;
pub mod cron;
pub mod error;
pub mod health;
pub mod predictions;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::config::Config;

pub fn router(state: AppState, cfg: &Config) -> Router {
    let v1 = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/health", get(health::health_check))
        .route("/models", get(predictions::list_models))
        .route("/predictions", get(predictions::get_range))
        .route("/predictions/latest", get(predictions::get_latest))
        .route("/predictions/at", get(predictions::get_one))
        .route("/simulate", post(predictions::simulate))
        .route("/consumption", get(consumption::get_range))
        .route("/consumption/stats", get(consumption::get_stats))
        .route("/cron/sync-predictions", post(cron::sync_predictions))
        .route("/cron/sync-consumption", post(cron::sync_consumption))
        .with_state(state);

    let mut router = Router::new().nest("/api/v1", v1);

    if cfg.server.enable_cors {
        use tower_http::cors::{AllowOrigin, CorsLayer};
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::exact("http://localhost:3000".parse().unwrap()))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}
