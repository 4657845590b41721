use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;
use crate::forecast::{ForecastEngine, OpenMeteoProvider, WeatherProvider};
use crate::ingest::{ConsumptionSource, ConsumptionSyncer, EpiasClient, EpiasCredentials, TicketCache};
use crate::repo::Stores;
use crate::scoring::{HttpScoringGateway, ScoringGateway};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub engine: Arc<ForecastEngine>,
    pub syncer: Arc<ConsumptionSyncer>,
    pub stores: Arc<Stores>,
    pub scorer: Arc<dyn ScoringGateway>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let stores = Arc::new(Stores::new(&cfg).await?);

        let weather: Arc<dyn WeatherProvider> = Arc::new(OpenMeteoProvider::new(
            cfg.weather.base_url.clone(),
            Duration::from_secs(cfg.weather.http_timeout_seconds),
        )?);

        let scorer: Arc<dyn ScoringGateway> = Arc::new(HttpScoringGateway::new(
            cfg.scoring.base_url.clone(),
            Duration::from_secs(cfg.scoring.http_timeout_seconds),
        )?);

        let source: Arc<dyn ConsumptionSource> = Arc::new(EpiasClient::new(
            cfg.epias.base_url.clone(),
            cfg.epias.auth_url.clone(),
            EpiasCredentials {
                username: cfg.epias.username.clone(),
                password: cfg.epias.password.clone(),
            },
            Duration::from_secs(cfg.epias.http_timeout_seconds),
            TicketCache::empty(),
        )?);

        Ok(Self::from_parts(cfg, weather, scorer, source, stores))
    }

    /// Assemble the state from explicit collaborators. Production wiring
    /// goes through [`AppState::new`]; tests inject stubs here.
    pub fn from_parts(
        cfg: Config,
        weather: Arc<dyn WeatherProvider>,
        scorer: Arc<dyn ScoringGateway>,
        source: Arc<dyn ConsumptionSource>,
        stores: Arc<Stores>,
    ) -> Self {
        let engine = Arc::new(ForecastEngine::new(
            weather,
            stores.consumption.clone(),
            stores.forecasts.clone(),
            scorer.clone(),
        ));

        let syncer = Arc::new(ConsumptionSyncer::new(
            source,
            stores.consumption.clone(),
            cfg.forecast.sync_window_hours,
        ));

        Self {
            cfg,
            engine,
            syncer,
            stores,
            scorer,
        }
    }
}
