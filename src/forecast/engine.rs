use std::sync::Arc;

use anyhow::Result;

use super::{ForecastDriver, WeatherProvider};
use crate::domain::{ForecastHorizon, ForecastPoint, ModelName, SimulationInput};
use crate::repo::{ConsumptionStore, ForecastStore};
use crate::scoring::ScoringGateway;

/// Wires the weather provider to the iterative driver.
pub struct ForecastEngine {
    weather: Arc<dyn WeatherProvider>,
    driver: ForecastDriver,
}

impl ForecastEngine {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        consumption: Arc<dyn ConsumptionStore>,
        forecasts: Arc<dyn ForecastStore>,
        scorer: Arc<dyn ScoringGateway>,
    ) -> Self {
        Self {
            weather,
            driver: ForecastDriver::new(consumption, forecasts, scorer),
        }
    }

    /// Fetch weather for the horizon, validate its shape, and run the
    /// iterative forecaster over it.
    pub async fn generate(&self, hours: u32, model: ModelName) -> Result<Vec<ForecastPoint>> {
        let hourly = self.weather.forecast(hours).await?;
        let horizon = ForecastHorizon::from_hourly(hours as usize, hourly)?;
        self.driver.run(&horizon, model).await
    }

    pub async fn simulate(&self, input: &SimulationInput) -> Result<ForecastPoint> {
        self.driver.simulate(input).await
    }
}
