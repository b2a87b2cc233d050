//! External data sources
//!
//! # Architecture
//! Each provider sits behind its own async trait so the completion cascade can
//! be driven by real HTTP clients, the offline [`NoLookup`], or test mocks.
//!
//! - [`StoreLookup`]: storefront details (release date, price)
//! - [`AggregateStatsLookup`]: playtime and live player count
//! - [`HistoricalPeaksLookup`]: all-time peak from the monthly charts
//!
//! `Ok(None)` means the provider has nothing for the record. Errors are
//! logged by the cascade and degrade to "no data".

pub mod cascade;
pub mod charts;
pub mod http;
pub mod steamspy;
pub mod store;

pub use cascade::ExternalCompletion;
pub use charts::SteamChartsClient;
pub use steamspy::SteamSpyClient;
pub use store::SteamStoreClient;

use crate::error::LookupError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type LookupResult<T> = Result<Option<T>, LookupError>;

/// Storefront answer for one app
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDetails {
    /// Release date as displayed (locale dependent)
    pub release_date_text: Option<String>,
    /// Final formatted price, absent for free or unreleased games
    pub price_text: Option<String>,
    pub is_free: bool,
}

/// Aggregate statistics for one app
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Average playtime in minutes
    pub avg_playtime: Option<u64>,
    /// Median playtime in minutes
    pub median_playtime: Option<u64>,
    /// Live concurrent users
    pub current_ccu: Option<u64>,
}

/// Peak player counts for one app
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPeaks {
    pub peak_24h: Option<u64>,
    pub peak_alltime: Option<u64>,
}

#[async_trait]
pub trait StoreLookup: Send + Sync {
    async fn lookup_store_details(&self, app_id: u64) -> LookupResult<StoreDetails>;
}

#[async_trait]
pub trait AggregateStatsLookup: Send + Sync {
    async fn lookup_aggregate_stats(&self, app_id: u64) -> LookupResult<AggregateStats>;
}

#[async_trait]
pub trait HistoricalPeaksLookup: Send + Sync {
    async fn lookup_historical_peaks(&self, app_id: u64) -> LookupResult<HistoricalPeaks>;
}

/// Offline source: every lookup answers "no data"
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

#[async_trait]
impl StoreLookup for NoLookup {
    async fn lookup_store_details(&self, _app_id: u64) -> LookupResult<StoreDetails> {
        Ok(None)
    }
}

#[async_trait]
impl AggregateStatsLookup for NoLookup {
    async fn lookup_aggregate_stats(&self, _app_id: u64) -> LookupResult<AggregateStats> {
        Ok(None)
    }
}

#[async_trait]
impl HistoricalPeaksLookup for NoLookup {
    async fn lookup_historical_peaks(&self, _app_id: u64) -> LookupResult<HistoricalPeaks> {
        Ok(None)
    }
}
