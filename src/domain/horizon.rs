use chrono::{DateTime, Duration, FixedOffset};
use thiserror::Error;

use super::{HourlyWeather, WeatherSnapshot};

/// A horizon step carries its own target timestamp so the engine never has
/// to reconstruct "hours since run start" from a bare array index.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonStep {
    pub index: usize,
    pub target: DateTime<FixedOffset>,
    pub weather: WeatherSnapshot,
}

/// Ordered sequence of hourly forecast targets.
///
/// Invariants, checked at construction: length matches the requested
/// horizon, timestamps strictly increase, spacing is exactly one hour.
#[derive(Debug, Clone)]
pub struct ForecastHorizon {
    steps: Vec<HorizonStep>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HorizonError {
    #[error("weather sequence has {actual} entries, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("weather sequence breaks hourly spacing at index {index}: expected {expected}, got {actual}")]
    NonContiguous {
        index: usize,
        expected: DateTime<FixedOffset>,
        actual: DateTime<FixedOffset>,
    },
}

impl ForecastHorizon {
    /// Build a horizon from provider output, failing fast on a malformed
    /// sequence instead of silently misaligning timestamps to indices.
    pub fn from_hourly(
        expected_hours: usize,
        hours: Vec<HourlyWeather>,
    ) -> Result<Self, HorizonError> {
        if hours.len() != expected_hours {
            return Err(HorizonError::LengthMismatch {
                expected: expected_hours,
                actual: hours.len(),
            });
        }

        let mut steps: Vec<HorizonStep> = Vec::with_capacity(hours.len());
        for (index, hour) in hours.into_iter().enumerate() {
            if index > 0 {
                let expected = steps[index - 1].target + Duration::hours(1);
                if hour.datetime != expected {
                    return Err(HorizonError::NonContiguous {
                        index,
                        expected,
                        actual: hour.datetime,
                    });
                }
            }
            steps.push(HorizonStep {
                index,
                target: hour.datetime,
                weather: hour.weather,
            });
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[HorizonStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
