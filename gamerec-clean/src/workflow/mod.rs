//! Completion orchestrator
//!
//! Drives each record through the state machine in [`state`]:
//! 1. Classify critical fields; nothing missing → `Intact`
//! 2. External completion for the missing fields
//! 3. Price-only gap left → free sentinel, `Salvaged`
//! 4. Player-count cluster: all missing → `Dropped`, some missing → estimate
//! 5. Only price unresolved → `Salvaged`; anything else unresolved → `Dropped`
//!
//! Records are processed strictly one at a time. A failure or panic inside one
//! record drops that record and the batch carries on.

pub mod cluster;
pub mod state;
pub mod statistics;

pub use cluster::ClusterEstimator;
pub use state::{ClusterStatus, FinalOutcome, RecordSession, RecordState, StateTransition};
pub use statistics::CleaningStats;

use crate::classifier::{is_field_missing, missing_counts, missing_fields};
use crate::config::CleanerSettings;
use crate::error::CompletionError;
use crate::sources::ExternalCompletion;
use crate::types::{
    CompletionResult, CriticalField, Decision, DropReason, FieldValue, Provenance, Record,
};
use futures::FutureExt;
use gamerec_common::time::millis_to_duration;
use rand::Rng;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Progress is logged every this many records
const PROGRESS_INTERVAL: usize = 50;

/// Result of cleaning a batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// Kept records in input order
    pub kept: Vec<Record>,
    /// One decision per input record, in input order
    pub decisions: Vec<Decision>,
    pub stats: CleaningStats,
}

pub struct CompletionOrchestrator {
    external: ExternalCompletion,
    estimator: ClusterEstimator,
    free_sentinel: String,
    record_pause_min: Duration,
    record_pause_max: Duration,
}

impl CompletionOrchestrator {
    pub fn new(external: ExternalCompletion, estimator: ClusterEstimator) -> Self {
        Self {
            external,
            estimator,
            free_sentinel: crate::types::FREE_SENTINEL.to_string(),
            record_pause_min: Duration::ZERO,
            record_pause_max: Duration::ZERO,
        }
    }

    /// Orchestrator with sentinel and pacing taken from `settings`
    pub fn from_settings(
        settings: &CleanerSettings,
        external: ExternalCompletion,
        estimator: ClusterEstimator,
    ) -> Self {
        Self::new(external, estimator)
            .with_free_sentinel(settings.free_sentinel.clone())
            .with_record_pause(
                millis_to_duration(settings.record_pause_min_ms),
                millis_to_duration(settings.record_pause_max_ms),
            )
    }

    pub fn with_free_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.free_sentinel = sentinel.into();
        self
    }

    /// Random pause in `[min, max]` after each record that needed lookups
    pub fn with_record_pause(mut self, min: Duration, max: Duration) -> Self {
        self.record_pause_min = min;
        self.record_pause_max = max.max(min);
        self
    }

    /// Drive one record to a decision, filling it in place
    ///
    /// Never fails: errors and panics become a `Dropped` decision.
    pub async fn process_record(&self, record: &mut Record) -> Decision {
        let app_id = record.app_id;
        let originally_missing = missing_fields(record);

        let outcome = AssertUnwindSafe(self.try_process(record, &originally_missing))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                error!(app_id, error = %e, "Record processing failed, dropping");
                Decision::failed(app_id, originally_missing, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(app_id, panic = %message, "Record processing panicked, dropping");
                Decision::failed(app_id, originally_missing, message)
            }
        }
    }

    async fn try_process(
        &self,
        record: &mut Record,
        originally_missing: &[CriticalField],
    ) -> Result<Decision, CompletionError> {
        let app_id = record.app_id;
        let mut session = RecordSession::new(app_id, originally_missing);
        let mut filled = CompletionResult::new();

        if originally_missing.is_empty() {
            return Ok(decide(session, originally_missing, vec![], filled, None));
        }
        debug!(app_id, missing = ?originally_missing, "Missing critical fields");

        let fetched = self.external.complete(app_id, originally_missing).await;
        apply(record, originally_missing, fetched, &mut filled);
        session.transition_to(RecordState::PartiallyCompleted);

        let still_missing = unresolved(record, originally_missing);

        if state::salvage_price_only(originally_missing, &still_missing) {
            self.salvage_price(record, &mut filled);
            session.transition_to(RecordState::Salvaged);
            return Ok(decide(session, originally_missing, vec![], filled, None));
        }

        match ClusterStatus::of(&still_missing) {
            ClusterStatus::Complete => {}
            ClusterStatus::AllMissing => {
                warn!(app_id, reason = %CompletionError::InsufficientSignal, "Dropping record");
                session.transition_to(RecordState::Dropped);
                return Ok(decide(
                    session,
                    originally_missing,
                    still_missing,
                    filled,
                    Some(DropReason::InsufficientSignal),
                ));
            }
            ClusterStatus::Partial(targets) => {
                session.transition_to(RecordState::Estimating);
                let estimates = self
                    .estimator
                    .estimate(record, &targets)
                    .map_err(|e| CompletionError::UnexpectedRecord(e.to_string()))?;
                apply(record, originally_missing, estimates, &mut filled);
            }
        }

        let remaining = unresolved(record, originally_missing);
        match FinalOutcome::of(&remaining) {
            FinalOutcome::Resolved => {
                session.transition_to(RecordState::Resolved);
                Ok(decide(session, originally_missing, vec![], filled, None))
            }
            FinalOutcome::SalvagePrice => {
                self.salvage_price(record, &mut filled);
                session.transition_to(RecordState::Salvaged);
                Ok(decide(session, originally_missing, vec![], filled, None))
            }
            FinalOutcome::Drop => {
                warn!(app_id, unresolved = ?remaining, "Dropping record with unresolved fields");
                session.transition_to(RecordState::Dropped);
                Ok(decide(
                    session,
                    originally_missing,
                    remaining,
                    filled,
                    Some(DropReason::Unresolved),
                ))
            }
        }
    }

    fn salvage_price(&self, record: &mut Record, filled: &mut CompletionResult) {
        debug!(app_id = record.app_id, sentinel = %self.free_sentinel, "Salvaging missing price");
        let value = FieldValue::Text(self.free_sentinel.clone());
        record.set(CriticalField::Price, value.clone());
        filled.supply(CriticalField::Price, value, Provenance::Salvage);
    }

    /// Process every record in order
    pub async fn run_batch(&self, records: Vec<Record>) -> BatchOutcome {
        let started = Instant::now();
        let total = records.len();
        let mut stats = CleaningStats {
            missing_before: missing_counts(&records),
            ..CleaningStats::default()
        };
        stats.missing_before.log("before");
        info!(total, "Cleaning batch");

        let mut kept = Vec::with_capacity(total);
        let mut decisions = Vec::with_capacity(total);

        for (index, mut record) in records.into_iter().enumerate() {
            let decision = self.process_record(&mut record).await;
            stats.record(&decision);

            let looked_up = ExternalCompletion::needs_lookup(&decision.originally_missing);
            if decision.is_kept() {
                kept.push(record);
            }
            decisions.push(decision);

            if (index + 1) % PROGRESS_INTERVAL == 0 {
                info!(processed = index + 1, total, kept = kept.len(), "Cleaning progress");
            }
            if looked_up && index + 1 < total {
                self.record_pause().await;
            }
        }

        stats.missing_after = missing_counts(&kept);
        stats.missing_after.log("after");
        stats.elapsed_seconds = started.elapsed().as_secs_f64();
        info!(summary = %stats.display_string(), "Cleaning finished");

        BatchOutcome {
            kept,
            decisions,
            stats,
        }
    }

    async fn record_pause(&self) {
        if self.record_pause_max.is_zero() {
            return;
        }
        let pause = rand::thread_rng().gen_range(self.record_pause_min..=self.record_pause_max);
        tokio::time::sleep(pause).await;
    }
}

/// Write supplied values into fields that are still missing
fn apply(
    record: &mut Record,
    originally_missing: &[CriticalField],
    supplied: CompletionResult,
    filled: &mut CompletionResult,
) {
    for (field, value) in supplied.iter() {
        if originally_missing.contains(&field) && is_field_missing(record, field) {
            record.set(field, value.value.clone());
            filled.supply(field, value.value.clone(), value.provenance);
        }
    }
}

/// Originally-missing fields that are still missing
fn unresolved(record: &Record, originally_missing: &[CriticalField]) -> Vec<CriticalField> {
    originally_missing
        .iter()
        .copied()
        .filter(|field| is_field_missing(record, *field))
        .collect()
}

fn decide(
    session: RecordSession,
    originally_missing: &[CriticalField],
    unresolved: Vec<CriticalField>,
    filled: CompletionResult,
    drop_reason: Option<DropReason>,
) -> Decision {
    Decision {
        app_id: session.app_id,
        state: session
            .state
            .terminal()
            .unwrap_or(crate::types::TerminalState::Dropped),
        originally_missing: originally_missing.to_vec(),
        unresolved,
        filled,
        drop_reason,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
