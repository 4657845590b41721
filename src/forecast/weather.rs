//! Weather forecast integration (Open-Meteo).
//!
//! National consumption tracks national weather, so the provider fetches
//! hourly forecasts for the seven largest cities and blends them into one
//! population-weighted series.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Europe::Istanbul;
use futures::future::try_join_all;
use itertools::izip;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{HourlyWeather, WeatherSnapshot};

/// City weights are population shares of the covered metro areas and sum
/// to 1.0.
struct City {
    name: &'static str,
    lat: f64,
    lon: f64,
    weight: f64,
}

const CITIES: [City; 7] = [
    City { name: "Istanbul", lat: 41.0082, lon: 28.9784, weight: 0.44 },
    City { name: "Ankara", lat: 39.9334, lon: 32.8597, weight: 0.15 },
    City { name: "Izmir", lat: 38.4237, lon: 27.1428, weight: 0.13 },
    City { name: "Bursa", lat: 40.1885, lon: 29.0610, weight: 0.09 },
    City { name: "Antalya", lat: 36.8969, lon: 30.7133, weight: 0.08 },
    City { name: "Adana", lat: 37.0000, lon: 35.3213, weight: 0.06 },
    City { name: "Konya", lat: 37.8746, lon: 32.4932, weight: 0.05 },
];

const HOURLY_VARIABLES: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
precipitation,wind_speed_10m,shortwave_radiation,weather_code";

/// Open-Meteo caps forecast requests at 16 days.
const MAX_FORECAST_DAYS: u32 = 16;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Exactly `horizon_hours` future entries in strictly increasing hourly
    /// order, covering `[next full hour, next full hour + horizon)`.
    async fn forecast(&self, horizon_hours: u32) -> Result<Vec<HourlyWeather>>;
}

pub struct OpenMeteoProvider {
    base_url: String,
    client: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch_city(&self, city: &City, forecast_days: u32) -> Result<OpenMeteoResponse> {
        debug!(city = city.name, forecast_days, "fetching city weather");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", city.lat.to_string()),
                ("longitude", city.lon.to_string()),
                ("hourly", HOURLY_VARIABLES.to_string()),
                ("timezone", "Europe/Istanbul".to_string()),
                ("forecast_days", forecast_days.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("weather request for {} failed", city.name))?;

        if !resp.status().is_success() {
            anyhow::bail!(
                "weather API error for {}: HTTP {}",
                city.name,
                resp.status()
            );
        }

        resp.json()
            .await
            .with_context(|| format!("weather response parse failed for {}", city.name))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn forecast(&self, horizon_hours: u32) -> Result<Vec<HourlyWeather>> {
        // One extra day of margin: today's already-elapsed hours are
        // dropped below.
        let forecast_days = (horizon_hours.div_ceil(24) + 1).min(MAX_FORECAST_DAYS);

        let cities = try_join_all(
            CITIES
                .iter()
                .map(|city| self.fetch_city(city, forecast_days)),
        )
        .await?;

        let blended = blend_cities(&cities)?;
        let series = future_window(blended, horizon_hours, Utc::now().fixed_offset())?;

        info!(hours = series.len(), "weather forecast assembled");
        Ok(series)
    }
}

/// Weighted hourly average across all cities. The first city's time axis is
/// authoritative; every city must cover the same hours.
fn blend_cities(cities: &[OpenMeteoResponse]) -> Result<Vec<HourlyWeather>> {
    let reference = &cities[0].hourly;
    for (city, resp) in CITIES.iter().zip(cities) {
        if resp.hourly.time.len() != reference.time.len() {
            anyhow::bail!(
                "weather series for {} has {} hours, expected {}",
                city.name,
                resp.hourly.time.len(),
                reference.time.len()
            );
        }
    }

    let temperature = weighted_series(cities, |h| &h.temperature_2m);
    let apparent = weighted_series(cities, |h| &h.apparent_temperature);
    let humidity = weighted_series(cities, |h| &h.relative_humidity_2m);
    let precipitation = weighted_series(cities, |h| &h.precipitation);
    let wind = weighted_series(cities, |h| &h.wind_speed_10m);
    let radiation = weighted_series(cities, |h| &h.shortwave_radiation);
    let code = weighted_series(cities, |h| &h.weather_code);

    izip!(
        &reference.time,
        temperature,
        apparent,
        humidity,
        precipitation,
        wind,
        radiation,
        code
    )
    .map(|(time, t, at, rh, p, ws, sr, wc)| {
        Ok(HourlyWeather {
            datetime: parse_istanbul_local(time)?,
            weather: WeatherSnapshot {
                temperature_2m: t,
                apparent_temperature: at,
                relative_humidity_2m: rh,
                precipitation: p,
                wind_speed_10m: ws,
                shortwave_radiation: sr,
                weather_code: wc.round() as i32,
            },
        })
    })
    .collect()
}

fn weighted_series(cities: &[OpenMeteoResponse], pick: impl Fn(&HourlyBlock) -> &Vec<f64>) -> Vec<f64> {
    let mut out = vec![0.0; pick(&cities[0].hourly).len()];
    for (city, resp) in CITIES.iter().zip(cities) {
        for (acc, value) in out.iter_mut().zip(pick(&resp.hourly)) {
            *acc += value * city.weight;
        }
    }
    out
}

/// Drop already-elapsed hours and cut the series to the horizon length.
fn future_window(
    series: Vec<HourlyWeather>,
    horizon_hours: u32,
    now: DateTime<FixedOffset>,
) -> Result<Vec<HourlyWeather>> {
    let future: Vec<HourlyWeather> = series.into_iter().filter(|h| h.datetime > now).collect();
    if future.len() < horizon_hours as usize {
        anyhow::bail!(
            "weather provider returned {} future hours, horizon needs {}",
            future.len(),
            horizon_hours
        );
    }
    Ok(future.into_iter().take(horizon_hours as usize).collect())
}

/// Open-Meteo returns local wall-clock times ("2025-01-15T14:00") when a
/// timezone parameter is supplied.
fn parse_istanbul_local(raw: &str) -> Result<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .with_context(|| format!("unparseable weather timestamp: {raw}"))?;
    naive
        .and_local_timezone(Istanbul)
        .single()
        .map(|dt| dt.fixed_offset())
        .with_context(|| format!("ambiguous local timestamp: {raw}"))
}

// Open-Meteo API response structures
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
    apparent_temperature: Vec<f64>,
    relative_humidity_2m: Vec<f64>,
    precipitation: Vec<f64>,
    wind_speed_10m: Vec<f64>,
    shortwave_radiation: Vec<f64>,
    weather_code: Vec<f64>,
}
