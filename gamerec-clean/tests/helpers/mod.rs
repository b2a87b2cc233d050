//! Shared fixtures for integration tests
//!
//! Lookups answer from per-app maps so one orchestrator can serve a whole batch.

#![allow(dead_code)]

use async_trait::async_trait;
use gamerec_clean::error::LookupError;
use gamerec_clean::features::FeatureExtractor;
use gamerec_clean::ml::ModelBank;
use gamerec_clean::sources::{
    AggregateStats, AggregateStatsLookup, ExternalCompletion, HistoricalPeaks,
    HistoricalPeaksLookup, LookupResult, NoLookup, StoreDetails, StoreLookup,
};
use gamerec_clean::types::{CriticalField, Record};
use gamerec_clean::workflow::{ClusterEstimator, CompletionOrchestrator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reference year the fixtures' release dates are measured against
pub const REFERENCE_YEAR: i32 = 2024;

/// Lookup answering from a fixed map; unknown ids get `default`
pub struct MapLookup<T> {
    answers: HashMap<u64, LookupResult<T>>,
    default: LookupResult<T>,
    calls: AtomicUsize,
}

impl<T: Clone> MapLookup<T> {
    pub fn empty() -> Self {
        Self {
            answers: HashMap::new(),
            default: Ok(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every id fails with `error`
    pub fn failing(error: LookupError) -> Self {
        Self {
            answers: HashMap::new(),
            default: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, app_id: u64, value: T) -> Self {
        self.answers.insert(app_id, Ok(Some(value)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, app_id: u64) -> LookupResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(&app_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl StoreLookup for MapLookup<StoreDetails> {
    async fn lookup_store_details(&self, app_id: u64) -> LookupResult<StoreDetails> {
        self.answer(app_id)
    }
}

#[async_trait]
impl AggregateStatsLookup for MapLookup<AggregateStats> {
    async fn lookup_aggregate_stats(&self, app_id: u64) -> LookupResult<AggregateStats> {
        self.answer(app_id)
    }
}

#[async_trait]
impl HistoricalPeaksLookup for MapLookup<HistoricalPeaks> {
    async fn lookup_historical_peaks(&self, app_id: u64) -> LookupResult<HistoricalPeaks> {
        self.answer(app_id)
    }
}

/// Store lookup that panics for one app id
pub struct PanickingStore {
    pub app_id: u64,
}

#[async_trait]
impl StoreLookup for PanickingStore {
    async fn lookup_store_details(&self, app_id: u64) -> LookupResult<StoreDetails> {
        if app_id == self.app_id {
            panic!("storefront exploded for {}", app_id);
        }
        Ok(None)
    }
}

/// Orchestrator with no external data
pub fn offline_orchestrator(bank: ModelBank) -> CompletionOrchestrator {
    let none = Arc::new(NoLookup);
    orchestrator_with(none.clone(), none.clone(), none, bank)
}

pub fn orchestrator_with(
    store: Arc<dyn StoreLookup>,
    stats: Arc<dyn AggregateStatsLookup>,
    charts: Arc<dyn HistoricalPeaksLookup>,
    bank: ModelBank,
) -> CompletionOrchestrator {
    CompletionOrchestrator::new(
        ExternalCompletion::new(store, stats, charts),
        ClusterEstimator::new(Arc::new(bank), FeatureExtractor::new(REFERENCE_YEAR)),
    )
}

/// Fully populated record released in 2018
pub fn complete_record(app_id: u64) -> Record {
    Record::new(app_id)
        .with(CriticalField::ReleaseDate, "Nov 1, 2018")
        .with(CriticalField::Price, "$29.99")
        .with(CriticalField::PlaytimeAvg, 600u64)
        .with(CriticalField::PlaytimeMedian, 400u64)
        .with(CriticalField::CurrentPlayers, 50u64)
        .with(CriticalField::Peak24h, 240u64)
        .with(CriticalField::PeakAlltime, 900u64)
}

/// The 2018 record with the whole player-count cluster zeroed
pub fn no_player_counts(app_id: u64) -> Record {
    complete_record(app_id)
        .with(CriticalField::CurrentPlayers, 0u64)
        .with(CriticalField::Peak24h, 0u64)
        .with(CriticalField::PeakAlltime, 0u64)
}

/// Write `contents` to `dir/name`
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

/// Canonical header row followed by `rows`
pub fn canonical_csv(rows: &[&str]) -> String {
    let mut csv = String::from(
        "app_id,name,release_date,price,playtime_avg,playtime_median,current_players,peak_24h,peak_alltime\n",
    );
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    csv
}
