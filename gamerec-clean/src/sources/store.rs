//! Steam storefront client
//!
//! # API Reference
//! - Endpoint: `https://store.steampowered.com/api/appdetails?appids={id}&cc={cc}&l={lang}`
//! - Response: `{ "<id>": { "success": bool, "data": { ... } } }`
//! - Used fields: `release_date.date`, `price_overview.final_formatted`, `is_free`

use super::http::PacedClient;
use super::{LookupResult, StoreDetails, StoreLookup};
use crate::config::CleanerSettings;
use crate::error::LookupError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct AppEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<AppData>,
}

#[derive(Debug, Deserialize)]
struct AppData {
    release_date: Option<ReleaseDate>,
    price_overview: Option<PriceOverview>,
    #[serde(default)]
    is_free: bool,
}

#[derive(Debug, Deserialize)]
struct ReleaseDate {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    final_formatted: Option<String>,
}

pub struct SteamStoreClient {
    http: PacedClient,
    base_url: String,
    country_code: String,
    language: String,
}

impl SteamStoreClient {
    pub fn new(settings: &CleanerSettings) -> Result<Self, LookupError> {
        Ok(Self {
            http: PacedClient::new(
                "store",
                settings.request_timeout(),
                &settings.user_agent,
                settings.store_requests_per_second,
                settings.retry_policy(),
            )?,
            base_url: settings.store_base_url.clone(),
            country_code: settings.country_code.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl StoreLookup for SteamStoreClient {
    async fn lookup_store_details(&self, app_id: u64) -> LookupResult<StoreDetails> {
        debug!(app_id, "Querying storefront");

        let query = [
            ("appids", app_id.to_string()),
            ("cc", self.country_code.clone()),
            ("l", self.language.clone()),
        ];
        let body = self
            .http
            .get(&self.base_url, &query)
            .await?
            .text()
            .await
            .map_err(|e| LookupError::Network(format!("Failed to read storefront body: {}", e)))?;

        parse_store_response(app_id, &body)
    }
}

/// Extract details from an `appdetails` body
pub fn parse_store_response(app_id: u64, body: &str) -> LookupResult<StoreDetails> {
    let mut envelopes: HashMap<String, AppEnvelope> = serde_json::from_str(body)
        .map_err(|e| LookupError::Parse(format!("Failed to parse storefront response: {}", e)))?;

    let Some(envelope) = envelopes.remove(&app_id.to_string()) else {
        return Ok(None);
    };
    let data = match envelope.data {
        Some(data) if envelope.success => data,
        _ => return Ok(None),
    };

    let release_date_text = data
        .release_date
        .and_then(|r| r.date)
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("n/a"));
    let price_text = data
        .price_overview
        .and_then(|p| p.final_formatted)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    Ok(Some(StoreDetails {
        release_date_text,
        price_text,
        is_free: data.is_free,
    }))
}
