//! External completion cascade
//!
//! Queries the providers in dependency order and collects whatever subset of
//! the missing fields they supply:
//! 1. Store: `release_date`, `price`
//! 2. Aggregate stats: `playtime_avg`, `playtime_median`, `current_players`, `peak_24h`
//! 3. Charts: `peak_alltime`, `peak_24h`
//!
//! A provider is only called when one of its fields is missing, only writes
//! fields it was asked for, and never overwrites a field an earlier provider
//! already supplied. Provider failures are logged and treated as "no data".

use super::{AggregateStatsLookup, HistoricalPeaksLookup, StoreLookup};
use crate::classifier::is_missing;
use crate::error::{CompletionError, LookupError};
use crate::types::{CompletionResult, CriticalField, FieldType, FieldValue, Provenance};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const STORE_FIELDS: [CriticalField; 2] = [CriticalField::ReleaseDate, CriticalField::Price];

const STATS_FIELDS: [CriticalField; 4] = [
    CriticalField::PlaytimeAvg,
    CriticalField::PlaytimeMedian,
    CriticalField::CurrentPlayers,
    CriticalField::Peak24h,
];

const CHARTS_FIELDS: [CriticalField; 2] = [CriticalField::PeakAlltime, CriticalField::Peak24h];

pub struct ExternalCompletion {
    store: Arc<dyn StoreLookup>,
    stats: Arc<dyn AggregateStatsLookup>,
    charts: Arc<dyn HistoricalPeaksLookup>,
    courtesy_pause: Duration,
    courtesy_jitter: Duration,
    free_sentinel: String,
}

impl ExternalCompletion {
    pub fn new(
        store: Arc<dyn StoreLookup>,
        stats: Arc<dyn AggregateStatsLookup>,
        charts: Arc<dyn HistoricalPeaksLookup>,
    ) -> Self {
        Self {
            store,
            stats,
            charts,
            courtesy_pause: Duration::ZERO,
            courtesy_jitter: Duration::ZERO,
            free_sentinel: crate::types::FREE_SENTINEL.to_string(),
        }
    }

    /// Pause after every external call, drawn from `pause ± jitter`
    pub fn with_courtesy_pause(mut self, pause: Duration, jitter: Duration) -> Self {
        self.courtesy_pause = pause;
        self.courtesy_jitter = jitter;
        self
    }

    pub fn with_free_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.free_sentinel = sentinel.into();
        self
    }

    /// True if any provider would be called for `missing`
    pub fn needs_lookup(missing: &[CriticalField]) -> bool {
        missing.iter().any(|f| {
            STORE_FIELDS.contains(f) || STATS_FIELDS.contains(f) || CHARTS_FIELDS.contains(f)
        })
    }

    /// Fetch what the providers can supply for `missing`
    pub async fn complete(&self, app_id: u64, missing: &[CriticalField]) -> CompletionResult {
        let mut result = CompletionResult::new();
        let wants = |fields: &[CriticalField]| missing.iter().any(|f| fields.contains(f));

        if wants(&STORE_FIELDS) {
            self.fill_from_store(app_id, missing, &mut result).await;
            self.pause().await;
        }
        if wants(&STATS_FIELDS) {
            self.fill_from_stats(app_id, missing, &mut result).await;
            self.pause().await;
        }
        if wants(&CHARTS_FIELDS) {
            self.fill_from_charts(app_id, missing, &mut result).await;
            self.pause().await;
        }

        debug!(
            app_id,
            requested = missing.len(),
            supplied = result.len(),
            "External completion finished"
        );
        result
    }

    async fn fill_from_store(
        &self,
        app_id: u64,
        missing: &[CriticalField],
        result: &mut CompletionResult,
    ) {
        let details = match self.store.lookup_store_details(app_id).await {
            Ok(Some(details)) => details,
            Ok(None) => return,
            Err(e) => return log_failure(app_id, "store", e),
        };

        if missing.contains(&CriticalField::ReleaseDate) {
            if let Some(date) = details.release_date_text {
                let value = FieldValue::Text(date);
                if !is_missing(&value, FieldType::ReleaseDate) {
                    result.supply(CriticalField::ReleaseDate, value, Provenance::Store);
                }
            }
        }

        if missing.contains(&CriticalField::Price) {
            match details.price_text {
                Some(price) if !is_missing(&FieldValue::Text(price.clone()), FieldType::Price) => {
                    result.supply(CriticalField::Price, price, Provenance::Store);
                }
                _ if details.is_free => {
                    result.supply(
                        CriticalField::Price,
                        self.free_sentinel.as_str(),
                        Provenance::Store,
                    );
                }
                _ => {}
            }
        }
    }

    async fn fill_from_stats(
        &self,
        app_id: u64,
        missing: &[CriticalField],
        result: &mut CompletionResult,
    ) {
        let stats = match self.stats.lookup_aggregate_stats(app_id).await {
            Ok(Some(stats)) => stats,
            Ok(None) => return,
            Err(e) => return log_failure(app_id, "aggregate stats", e),
        };

        let offers = [
            (CriticalField::PlaytimeAvg, stats.avg_playtime),
            (CriticalField::PlaytimeMedian, stats.median_playtime),
            (CriticalField::CurrentPlayers, stats.current_ccu),
            // The live count doubles as the 24h estimate
            (CriticalField::Peak24h, stats.current_ccu),
        ];
        supply_counts(result, missing, &offers, Provenance::AggregateStats);
    }

    async fn fill_from_charts(
        &self,
        app_id: u64,
        missing: &[CriticalField],
        result: &mut CompletionResult,
    ) {
        let peaks = match self.charts.lookup_historical_peaks(app_id).await {
            Ok(Some(peaks)) => peaks,
            Ok(None) => return,
            Err(e) => return log_failure(app_id, "charts", e),
        };

        let offers = [
            (CriticalField::PeakAlltime, peaks.peak_alltime),
            (CriticalField::Peak24h, peaks.peak_24h),
        ];
        supply_counts(result, missing, &offers, Provenance::Charts);
    }

    async fn pause(&self) {
        let delay = self.courtesy_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn courtesy_delay(&self) -> Duration {
        let low = self.courtesy_pause.saturating_sub(self.courtesy_jitter);
        let high = self.courtesy_pause + self.courtesy_jitter;
        if high.is_zero() {
            return Duration::ZERO;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Supply strictly positive counts for requested fields
fn supply_counts(
    result: &mut CompletionResult,
    missing: &[CriticalField],
    offers: &[(CriticalField, Option<u64>)],
    provenance: Provenance,
) {
    for (field, value) in offers {
        if let Some(count) = value.filter(|c| *c > 0) {
            if missing.contains(field) {
                result.supply(*field, count, provenance);
            }
        }
    }
}

fn log_failure(app_id: u64, provider: &'static str, error: LookupError) {
    let error = match error {
        LookupError::RateLimited(p) => CompletionError::RateLimited(p),
        other => CompletionError::LookupFailure(other),
    };
    warn!(app_id, provider, error = %error, "Lookup degraded to no data");
}
