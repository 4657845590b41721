#![cfg(feature = "db")]

//! Postgres-backed stores. Schema:
//!
//! ```sql
//! CREATE TABLE actual_consumption (
//!     datetime        TIMESTAMPTZ PRIMARY KEY,
//!     consumption_mwh DOUBLE PRECISION NOT NULL
//! );
//! CREATE TABLE predictions (
//!     target_datetime TIMESTAMPTZ NOT NULL,
//!     model_name      TEXT NOT NULL,
//!     predicted_mwh   DOUBLE PRECISION NOT NULL,
//!     weather         JSONB NOT NULL,
//!     PRIMARY KEY (target_datetime, model_name)
//! );
//! ```

use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use super::{ConsumptionStore, ForecastStore};
use crate::domain::{ConsumptionRecord, ForecastPoint, ModelName};

pub struct PgRepo {
    pub pool: PgPool,
}

impl PgRepo {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn consumption(&self) -> PgConsumptionStore {
        PgConsumptionStore {
            pool: self.pool.clone(),
        }
    }

    pub fn forecasts(&self) -> PgForecastStore {
        PgForecastStore {
            pool: self.pool.clone(),
        }
    }
}

pub struct PgConsumptionStore {
    pool: PgPool,
}

#[async_trait]
impl ConsumptionStore for PgConsumptionStore {
    async fn upsert(&self, datetime: DateTime<FixedOffset>, consumption_mwh: f64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO actual_consumption (datetime, consumption_mwh)
            VALUES ($1, $2)
            ON CONFLICT (datetime) DO UPDATE SET consumption_mwh = EXCLUDED.consumption_mwh
            "#,
        )
        .bind(datetime)
        .bind(consumption_mwh)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_exact(&self, datetime: DateTime<FixedOffset>) -> Result<Option<f64>> {
        let value: Option<f64> = sqlx::query_scalar(
            "SELECT consumption_mwh FROM actual_consumption WHERE datetime = $1",
        )
        .bind(datetime)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn latest(&self, limit: usize) -> Result<Vec<ConsumptionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT datetime, consumption_mwh
            FROM actual_consumption
            ORDER BY datetime DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(consumption_row).collect()
    }

    async fn by_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT datetime, consumption_mwh
            FROM actual_consumption
            WHERE datetime >= $1 AND datetime <= $2
            ORDER BY datetime ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(consumption_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actual_consumption")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_older_than(&self, cutoff: DateTime<FixedOffset>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM actual_consumption WHERE datetime < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn consumption_row(row: sqlx::postgres::PgRow) -> Result<ConsumptionRecord> {
    Ok(ConsumptionRecord {
        datetime: row.try_get::<DateTime<FixedOffset>, _>("datetime")?,
        consumption_mwh: row.try_get("consumption_mwh")?,
    })
}

pub struct PgForecastStore {
    pool: PgPool,
}

#[async_trait]
impl ForecastStore for PgForecastStore {
    async fn upsert(&self, point: &ForecastPoint) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO predictions (target_datetime, model_name, predicted_mwh, weather)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (target_datetime, model_name)
            DO UPDATE SET predicted_mwh = EXCLUDED.predicted_mwh, weather = EXCLUDED.weather
            "#,
        )
        .bind(point.target_datetime)
        .bind(point.model.to_string())
        .bind(point.predicted_mwh)
        .bind(serde_json::to_value(&point.weather)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        model: Option<ModelName>,
    ) -> Result<Vec<ForecastPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT target_datetime, model_name, predicted_mwh, weather
            FROM predictions
            WHERE target_datetime >= $1 AND target_datetime <= $2
              AND ($3::TEXT IS NULL OR model_name = $3)
            ORDER BY target_datetime ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(model.map(|m| m.to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(forecast_row).collect()
    }

    async fn upcoming(
        &self,
        now: DateTime<FixedOffset>,
        hours: u32,
        model: Option<ModelName>,
    ) -> Result<Vec<ForecastPoint>> {
        let end = now + Duration::hours(i64::from(hours));
        let rows = sqlx::query(
            r#"
            SELECT target_datetime, model_name, predicted_mwh, weather
            FROM predictions
            WHERE target_datetime >= $1 AND target_datetime < $2
              AND ($3::TEXT IS NULL OR model_name = $3)
            ORDER BY target_datetime ASC
            "#,
        )
        .bind(now)
        .bind(end)
        .bind(model.map(|m| m.to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(forecast_row).collect()
    }

    async fn get_one(
        &self,
        target_datetime: DateTime<FixedOffset>,
        model: ModelName,
    ) -> Result<Option<ForecastPoint>> {
        let row = sqlx::query(
            r#"
            SELECT target_datetime, model_name, predicted_mwh, weather
            FROM predictions
            WHERE target_datetime = $1 AND model_name = $2
            "#,
        )
        .bind(target_datetime)
        .bind(model.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(forecast_row).transpose()
    }

    async fn delete_older_than(&self, cutoff: DateTime<FixedOffset>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM predictions WHERE target_datetime < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn forecast_row(row: sqlx::postgres::PgRow) -> Result<ForecastPoint> {
    let model_name: String = row.try_get("model_name")?;
    Ok(ForecastPoint {
        target_datetime: row.try_get::<DateTime<FixedOffset>, _>("target_datetime")?,
        model: ModelName::from_str(&model_name)?,
        predicted_mwh: row.try_get("predicted_mwh")?,
        weather: serde_json::from_value(row.try_get::<serde_json::Value, _>("weather")?)?,
    })
}
