//! SteamSpy aggregate statistics client
//!
//! # API Reference
//! - Endpoint: `https://steamspy.com/api.php?request=appdetails&appid={id}`
//! - Used fields: `average_forever`, `median_forever` (minutes), `ccu`
//!
//! SteamSpy reports unknown values as zero, so zeros are dropped here.

use super::http::PacedClient;
use super::{AggregateStats, AggregateStatsLookup, LookupResult};
use crate::config::CleanerSettings;
use crate::error::LookupError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SteamSpyApp {
    appid: Option<u64>,
    #[serde(default)]
    average_forever: Option<f64>,
    #[serde(default)]
    median_forever: Option<f64>,
    #[serde(default)]
    ccu: Option<f64>,
}

pub struct SteamSpyClient {
    http: PacedClient,
    base_url: String,
}

impl SteamSpyClient {
    pub fn new(settings: &CleanerSettings) -> Result<Self, LookupError> {
        Ok(Self {
            http: PacedClient::new(
                "steamspy",
                settings.request_timeout(),
                &settings.user_agent,
                settings.stats_requests_per_second,
                settings.retry_policy(),
            )?,
            base_url: settings.stats_base_url.clone(),
        })
    }
}

#[async_trait]
impl AggregateStatsLookup for SteamSpyClient {
    async fn lookup_aggregate_stats(&self, app_id: u64) -> LookupResult<AggregateStats> {
        debug!(app_id, "Querying SteamSpy");

        let query = [
            ("request", "appdetails".to_string()),
            ("appid", app_id.to_string()),
        ];
        let body = self
            .http
            .get(&self.base_url, &query)
            .await?
            .text()
            .await
            .map_err(|e| LookupError::Network(format!("Failed to read SteamSpy body: {}", e)))?;

        parse_steamspy_response(&body)
    }
}

/// Extract stats from an `appdetails` body
pub fn parse_steamspy_response(body: &str) -> LookupResult<AggregateStats> {
    let app: SteamSpyApp = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse SteamSpy response: {}", e)))?;

    // Unknown ids come back with appid 0 and all-zero fields
    if app.appid == Some(0) {
        return Ok(None);
    }

    let stats = AggregateStats {
        avg_playtime: positive_count(app.average_forever),
        median_playtime: positive_count(app.median_forever),
        current_ccu: positive_count(app.ccu),
    };
    if stats == AggregateStats::default() {
        return Ok(None);
    }
    Ok(Some(stats))
}

fn positive_count(value: Option<f64>) -> Option<u64> {
    value.filter(|v| v.is_finite() && *v > 0.0).map(|v| v as u64).filter(|v| *v > 0)
}
