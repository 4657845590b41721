use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::domain::ModelName;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub forecast: ForecastConfig,
    pub scoring: ScoringConfig,
    pub weather: WeatherConfig,
    pub epias: EpiasConfig,
    pub db: DbConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for the scheduled trigger endpoints.
    pub cron_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    pub horizon_hours: u32,
    pub default_model: ModelName,
    /// Trailing window re-read on every consumption sync.
    pub sync_window_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    pub base_url: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpiasConfig {
    pub base_url: String,
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("GLF__").split("__"));
        Ok(figment.extract()?)
    }
}
