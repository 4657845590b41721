//! EPIAS transparency platform client (real-time national consumption).
//!
//! Auth is CAS ticket based: a form-urlencoded POST yields a plain-text
//! `TGT-…` ticket valid for two hours, sent on data requests as a `TGT`
//! header.

use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use chrono_tz::Europe::Istanbul;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::ConsumptionSource;
use crate::domain::ConsumptionRecord;

const TICKET_VALIDITY_HOURS: i64 = 2;
/// Refresh this long before the ticket actually expires.
const TICKET_EXPIRY_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct EpiasCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
struct CachedTicket {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedTicket {
    fn usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::minutes(TICKET_EXPIRY_BUFFER_MINUTES)
    }
}

/// Owned, injectable ticket cache. Constructed empty and handed to the
/// client instance that uses it, so no auth state lives outside the object
/// graph and tests can start from a known-cold cache.
#[derive(Default)]
pub struct TicketCache {
    slot: RwLock<Option<CachedTicket>>,
}

impl TicketCache {
    pub fn empty() -> Self {
        Self::default()
    }

    async fn get_valid(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|t| t.usable_at(now))
            .map(|t| t.token.clone())
    }

    async fn store(&self, token: String, now: DateTime<Utc>) {
        let mut slot = self.slot.write().await;
        *slot = Some(CachedTicket {
            token,
            expires_at: now + Duration::hours(TICKET_VALIDITY_HOURS),
        });
    }
}

pub struct EpiasClient {
    base_url: String,
    auth_url: String,
    credentials: EpiasCredentials,
    client: Client,
    tickets: TicketCache,
}

impl EpiasClient {
    pub fn new(
        base_url: String,
        auth_url: String,
        credentials: EpiasCredentials,
        timeout: StdDuration,
        tickets: TicketCache,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url,
            credentials,
            client,
            tickets,
        })
    }

    async fn ticket(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.tickets.get_valid(now).await {
            return Ok(token);
        }

        let token = self.request_ticket().await?;
        self.tickets.store(token.clone(), now).await;
        Ok(token)
    }

    async fn request_ticket(&self) -> Result<String> {
        debug!("requesting fresh auth ticket");

        let resp = self
            .client
            .post(&self.auth_url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .context("auth request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("auth response read failed")?;
        if !status.is_success() {
            anyhow::bail!("auth failed: HTTP {status}: {body}");
        }

        let token = body.trim();
        if !token.starts_with("TGT-") {
            let preview: String = token.chars().take(40).collect();
            anyhow::bail!("unexpected ticket format: {preview}");
        }

        info!("auth ticket refreshed");
        Ok(token.to_string())
    }

    async fn fetch_realtime(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>> {
        let ticket = self.ticket().await?;

        let request = RangeRequest {
            start_date: format_local(start),
            end_date: format_local(end),
        };

        let resp = self
            .client
            .post(format!(
                "{}/consumption/data/realtime-consumption",
                self.base_url
            ))
            .header("TGT", ticket)
            .json(&request)
            .send()
            .await
            .context("consumption request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("consumption API error: HTTP {status}: {body}");
        }

        let parsed: RealtimeResponse = resp
            .json()
            .await
            .context("consumption response parse failed")?;

        Ok(parsed
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| ConsumptionRecord {
                datetime: item.date,
                consumption_mwh: item.consumption,
            })
            .collect())
    }
}

#[async_trait]
impl ConsumptionSource for EpiasClient {
    async fn fetch_range(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<ConsumptionRecord>> {
        self.fetch_realtime(start, end).await
    }
}

/// The API expects local wall-clock timestamps with an explicit offset.
fn format_local(at: DateTime<FixedOffset>) -> String {
    at.with_timezone(&Istanbul)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

#[derive(Debug, Serialize)]
struct RangeRequest {
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "endDate")]
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    items: Option<Vec<RealtimeItem>>,
}

#[derive(Debug, Deserialize)]
struct RealtimeItem {
    date: DateTime<FixedOffset>,
    consumption: f64,
}
