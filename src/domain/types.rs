use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Gradient-boosting model served by the external scoring service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ModelName {
    Catboost,
    Lightgbm,
    Xgboost,
}

impl Default for ModelName {
    fn default() -> Self {
        Self::Catboost
    }
}

/// Hourly weather record, nationally aggregated (population-weighted city average).
///
/// Field names follow the Open-Meteo hourly variables verbatim; the scoring
/// service expects exactly these keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WeatherSnapshot {
    pub temperature_2m: f64,
    pub apparent_temperature: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub relative_humidity_2m: f64,
    #[validate(range(min = 0.0))]
    pub precipitation: f64,
    #[validate(range(min = 0.0))]
    pub wind_speed_10m: f64,
    #[validate(range(min = 0.0))]
    pub shortwave_radiation: f64,
    #[validate(range(min = 0))]
    pub weather_code: i32,
}

/// Weather for one horizon hour, tagged with its target timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub datetime: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub weather: WeatherSnapshot,
}

/// Consumption values (MWh) at fixed offsets before a prediction target hour.
///
/// Each value comes either from historical actuals or from a forecast
/// generated earlier in the same run, never from anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct LagSet {
    #[validate(range(min = 0.0))]
    pub lag_1h: f64,
    #[validate(range(min = 0.0))]
    pub lag_24h: f64,
    #[validate(range(min = 0.0))]
    pub lag_168h: f64,
}

impl LagSet {
    pub fn uniform(value: f64) -> Self {
        Self {
            lag_1h: value,
            lag_24h: value,
            lag_168h: value,
        }
    }
}

/// One generated forecast, keyed by (target_datetime, model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub target_datetime: DateTime<FixedOffset>,
    pub model: ModelName,
    pub predicted_mwh: f64,
    pub weather: WeatherSnapshot,
}

/// One hour of actual national consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub datetime: DateTime<FixedOffset>,
    pub consumption_mwh: f64,
}

/// Forecast joined with the actual value for the same hour, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyComparison {
    pub datetime: DateTime<FixedOffset>,
    pub predicted_mwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_mwh: Option<f64>,
    pub model: ModelName,
}

/// Dashboard summary of the ingested consumption history.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumptionStats {
    pub last_synced_at: Option<DateTime<FixedOffset>>,
    pub total_records: u64,
    pub latest_mwh: Option<f64>,
}

/// Caller-supplied inputs for a one-shot what-if prediction.
///
/// Validated at the API boundary; the engine trusts these values and skips
/// both the lag resolver and the previous-predictions buffer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SimulationInput {
    pub datetime: DateTime<FixedOffset>,
    #[serde(default)]
    pub model: ModelName,
    #[validate(nested)]
    pub weather: WeatherSnapshot,
    #[validate(nested)]
    pub lags: LagSet,
}
