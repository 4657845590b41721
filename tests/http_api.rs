//! HTTP boundary tests: trigger auth, response shapes, and error mapping.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Duration, FixedOffset};
use http_body_util::BodyExt;
use tower::ServiceExt;

use grid_load_forecaster::api;
use grid_load_forecaster::app::AppState;
use grid_load_forecaster::config::{
    AuthConfig, Config, DbConfig, EpiasConfig, ForecastConfig, ScoringConfig, ServerConfig,
    WeatherConfig,
};
use grid_load_forecaster::domain::{
    ConsumptionRecord, ForecastPoint, HourlyWeather, LagSet, ModelName, WeatherSnapshot,
};
use grid_load_forecaster::forecast::WeatherProvider;
use grid_load_forecaster::ingest::ConsumptionSource;
use grid_load_forecaster::repo::{
    ConsumptionStore, ForecastStore, MemoryConsumptionStore, MemoryForecastStore, Stores,
};
use grid_load_forecaster::scoring::{AvailableModels, ScoringGateway};

const SECRET: &str = "test-cron-secret";
const RUN_START: &str = "2025-01-20T00:00:00+03:00";

fn ts(s: &str) -> DateTime<FixedOffset> {
    s.parse().unwrap()
}

fn snapshot() -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_2m: 8.0,
        apparent_temperature: 6.5,
        relative_humidity_2m: 70.0,
        precipitation: 0.1,
        wind_speed_10m: 4.0,
        shortwave_radiation: 90.0,
        weather_code: 2,
    }
}

fn config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 30,
            enable_cors: false,
        },
        auth: AuthConfig {
            cron_secret: SECRET.into(),
        },
        forecast: ForecastConfig {
            horizon_hours: 5,
            default_model: ModelName::Catboost,
            sync_window_hours: 4,
        },
        scoring: ScoringConfig {
            base_url: "http://localhost:8000".into(),
            http_timeout_seconds: 5,
        },
        weather: WeatherConfig {
            base_url: "http://localhost:8001".into(),
            http_timeout_seconds: 5,
        },
        epias: EpiasConfig {
            base_url: "http://localhost:8002".into(),
            auth_url: "http://localhost:8002/tickets".into(),
            username: "user".into(),
            password: "pass".into(),
            http_timeout_seconds: 5,
        },
        db: DbConfig {
            url: String::new(),
        },
    }
}

struct FixedWeather;

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn forecast(&self, horizon_hours: u32) -> Result<Vec<HourlyWeather>> {
        let start = ts(RUN_START);
        Ok((0..horizon_hours)
            .map(|h| HourlyWeather {
                datetime: start + Duration::hours(i64::from(h)),
                weather: snapshot(),
            })
            .collect())
    }
}

struct StubScorer {
    fail: bool,
}

#[async_trait]
impl ScoringGateway for StubScorer {
    async fn predict(
        &self,
        _datetime: DateTime<FixedOffset>,
        _weather: &WeatherSnapshot,
        lags: LagSet,
        _model: ModelName,
    ) -> Result<f64> {
        if self.fail {
            anyhow::bail!("model server went away")
        }
        Ok(lags.lag_1h + 10.0)
    }

    async fn models(&self) -> Result<AvailableModels> {
        Ok(AvailableModels {
            models: vec!["catboost".into()],
            default: "catboost".into(),
        })
    }

    async fn health(&self) -> bool {
        !self.fail
    }
}

struct StubSource;

#[async_trait]
impl ConsumptionSource for StubSource {
    async fn fetch_range(
        &self,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>> {
        Ok(vec![
            ConsumptionRecord {
                datetime: ts("2025-01-19T22:00:00+03:00"),
                consumption_mwh: 35200.0,
            },
            ConsumptionRecord {
                datetime: ts("2025-01-19T23:00:00+03:00"),
                consumption_mwh: 35400.0,
            },
        ])
    }
}

struct TestApp {
    router: axum::Router,
    stores: Arc<Stores>,
}

fn test_app(scorer_fails: bool) -> TestApp {
    let cfg = config();
    let stores = Arc::new(Stores {
        consumption: Arc::new(MemoryConsumptionStore::default()),
        forecasts: Arc::new(MemoryForecastStore::default()),
    });
    let state = AppState::from_parts(
        cfg.clone(),
        Arc::new(FixedWeather),
        Arc::new(StubScorer { fail: scorer_fails }),
        Arc::new(StubSource),
        stores.clone(),
    );
    TestApp {
        router: api::router(state, &cfg),
        stores,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn cron_rejects_missing_bearer() {
    let app = test_app(false);
    let response = app
        .router
        .oneshot(post("/api/v1/cron/sync-predictions", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert!(body.get("message").is_none(), "401 must not leak detail");
}

#[tokio::test]
async fn cron_rejects_wrong_secret() {
    let app = test_app(false);
    let response = app
        .router
        .oneshot(post("/api/v1/cron/sync-consumption", Some("not-the-secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sync_predictions_reports_generated_count() {
    let app = test_app(false);
    let response = app
        .router
        .oneshot(post("/api/v1/cron/sync-predictions", Some(SECRET)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 5);
    assert!(body["timestamp"].is_string());

    let stored = app
        .stores
        .forecasts
        .by_range(
            ts(RUN_START),
            ts(RUN_START) + Duration::hours(5),
            Some(ModelName::Catboost),
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn sync_consumption_reports_upserted_count() {
    let app = test_app(false);
    let response = app
        .router
        .oneshot(post("/api/v1/cron/sync-consumption", Some(SECRET)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);

    assert_eq!(app.stores.consumption.count().await.unwrap(), 2);
}

#[tokio::test]
async fn failed_sync_returns_500_with_diagnostic_message() {
    let app = test_app(true);
    let response = app
        .router
        .oneshot(post("/api/v1/cron/sync-predictions", Some(SECRET)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Sync failed");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("model server went away"));
}

#[tokio::test]
async fn simulate_validates_input_at_the_boundary() {
    let app = test_app(false);
    let payload = serde_json::json!({
        "datetime": "2025-01-21T10:00:00+03:00",
        "weather": {
            "temperature_2m": 10.0,
            "apparent_temperature": 9.0,
            "relative_humidity_2m": 140.0,
            "precipitation": 0.0,
            "wind_speed_10m": 2.0,
            "shortwave_radiation": 100.0,
            "weather_code": 3
        },
        "lags": { "lag_1h": 40000.0, "lag_24h": 38000.0, "lag_168h": 36000.0 }
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/simulate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn simulate_returns_prediction_without_storing_it() {
    let app = test_app(false);
    let payload = serde_json::json!({
        "datetime": "2025-01-21T10:00:00+03:00",
        "model": "xgboost",
        "weather": {
            "temperature_2m": 10.0,
            "apparent_temperature": 9.0,
            "relative_humidity_2m": 70.0,
            "precipitation": 0.0,
            "wind_speed_10m": 2.0,
            "shortwave_radiation": 100.0,
            "weather_code": 3
        },
        "lags": { "lag_1h": 40000.0, "lag_24h": 38000.0, "lag_168h": 36000.0 }
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/simulate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["predicted_mwh"], 40010.0);
    assert_eq!(body["model"], "xgboost");

    let stored = app
        .stores
        .forecasts
        .by_range(
            ts("2025-01-01T00:00:00+03:00"),
            ts("2025-12-31T00:00:00+03:00"),
            None,
        )
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn predictions_range_joins_actuals_by_hour() {
    let app = test_app(false);
    let at = ts("2025-01-20T10:00:00+03:00");

    app.stores
        .forecasts
        .upsert(&ForecastPoint {
            target_datetime: at,
            model: ModelName::Catboost,
            predicted_mwh: 35500.0,
            weather: snapshot(),
        })
        .await
        .unwrap();
    app.stores
        .forecasts
        .upsert(&ForecastPoint {
            target_datetime: at + Duration::hours(1),
            model: ModelName::Catboost,
            predicted_mwh: 35600.0,
            weather: snapshot(),
        })
        .await
        .unwrap();
    app.stores.consumption.upsert(at, 35480.0).await.unwrap();

    let request = Request::builder()
        .uri("/api/v1/predictions?start=2025-01-20T10:00:00%2B03:00&end=2025-01-20T12:00:00%2B03:00")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["predicted_mwh"], 35500.0);
    assert_eq!(rows[0]["actual_mwh"], 35480.0);
    assert!(rows[1].get("actual_mwh").is_none());
}

#[tokio::test]
async fn prediction_lookup_misses_with_404() {
    let app = test_app(false);
    let request = Request::builder()
        .uri("/api/v1/predictions/at?datetime=2025-01-20T10:00:00%2B03:00&model=catboost")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_degrades_when_scoring_is_down() {
    let app = test_app(true);
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["scoring"]["status"], "unhealthy");
}
