//! End-to-end completion scenarios
//!
//! Each test drives records through the orchestrator with scripted lookups
//! and checks the terminal decision plus the values written into the record.

mod helpers;

use gamerec_clean::error::LookupError;
use gamerec_clean::features::FeatureExtractor;
use gamerec_clean::ml::{LinearRegression, ModelBank, ModelEntry, TrainedModel};
use gamerec_clean::sources::{AggregateStats, HistoricalPeaks, StoreDetails};
use gamerec_clean::training::{Trainer, TrainerConfig};
use gamerec_clean::types::{
    CriticalField, DropReason, FieldValue, PlayerTarget, Provenance, Record, TerminalState,
    Verdict,
};
use helpers::*;
use std::sync::Arc;

fn supplied(record: &Record, field: CriticalField) -> Option<f64> {
    record.number(field)
}

/// Bank whose every target predicts a large positive count
fn generous_bank() -> ModelBank {
    let mut bank = ModelBank::new();
    for target in PlayerTarget::ALL {
        bank.insert(ModelEntry {
            target,
            model: TrainedModel::Linear(LinearRegression {
                intercept: 1000.0,
                coefficients: vec![0.0],
            }),
            feature_names: vec!["game_age_years".to_string()],
        });
    }
    bank
}

#[tokio::test]
async fn test_all_player_counts_missing_is_dropped() {
    // Given: a 2018 game with no player counts, no external data, no models
    let mut record = no_player_counts(1);
    let orchestrator = offline_orchestrator(ModelBank::new());

    // When
    let decision = orchestrator.process_record(&mut record).await;

    // Then: nothing to anchor an estimate on
    assert_eq!(decision.verdict(), Verdict::Dropped);
    assert_eq!(decision.drop_reason, Some(DropReason::InsufficientSignal));
    assert_eq!(
        decision.unresolved,
        vec![
            CriticalField::CurrentPlayers,
            CriticalField::Peak24h,
            CriticalField::PeakAlltime
        ]
    );
}

#[tokio::test]
async fn test_all_player_counts_missing_is_dropped_even_with_models() {
    let mut record = no_player_counts(2);
    let decision = offline_orchestrator(generous_bank())
        .process_record(&mut record)
        .await;

    assert_eq!(decision.state, TerminalState::Dropped);
    assert_eq!(decision.drop_reason, Some(DropReason::InsufficientSignal));
    assert!(decision.filled.is_empty());
}

#[tokio::test]
async fn test_partial_cluster_resolved_by_heuristic() {
    // Given: only current_players known, game is 6 years old
    let mut record = no_player_counts(3).with(CriticalField::CurrentPlayers, 50u64);
    let orchestrator = offline_orchestrator(ModelBank::new());

    let decision = orchestrator.process_record(&mut record).await;

    // Then: 50 / 0.2 = 250, 250 × 3.5 = 875
    assert_eq!(decision.state, TerminalState::Resolved);
    assert_eq!(decision.verdict(), Verdict::Completed);
    assert_eq!(supplied(&record, CriticalField::Peak24h), Some(250.0));
    assert_eq!(supplied(&record, CriticalField::PeakAlltime), Some(875.0));
    assert_eq!(
        decision.filled.get(CriticalField::Peak24h).unwrap().provenance,
        Provenance::Heuristic
    );
}

#[tokio::test]
async fn test_price_only_missing_is_salvaged() {
    let mut record = complete_record(4).with(CriticalField::Price, FieldValue::Null);
    let store = Arc::new(MapLookup::<StoreDetails>::empty());
    let none = Arc::new(gamerec_clean::sources::NoLookup);
    let orchestrator = orchestrator_with(store.clone(), none.clone(), none, ModelBank::new());

    let decision = orchestrator.process_record(&mut record).await;

    assert_eq!(store.call_count(), 1);
    assert_eq!(decision.state, TerminalState::Salvaged);
    assert_eq!(record.get(CriticalField::Price), &FieldValue::Text("Free".into()));
    assert_eq!(
        decision.filled.get(CriticalField::Price).unwrap().provenance,
        Provenance::Salvage
    );
}

#[tokio::test]
async fn test_price_only_missing_survives_store_failure() {
    let mut record = complete_record(5).with(CriticalField::Price, "N/A");
    let store = Arc::new(MapLookup::<StoreDetails>::failing(LookupError::Http {
        status: 503,
    }));
    let none = Arc::new(gamerec_clean::sources::NoLookup);

    let decision = orchestrator_with(store, none.clone(), none, ModelBank::new())
        .process_record(&mut record)
        .await;

    assert_eq!(decision.verdict(), Verdict::Salvaged);
}

#[tokio::test]
async fn test_external_sources_fill_cluster() {
    // Given: stats know the live count, charts know the all-time peak
    let mut record = no_player_counts(6);
    let stats = Arc::new(MapLookup::<AggregateStats>::empty().with(
        6,
        AggregateStats {
            avg_playtime: None,
            median_playtime: None,
            current_ccu: Some(75),
        },
    ));
    let charts = Arc::new(MapLookup::<HistoricalPeaks>::empty().with(
        6,
        HistoricalPeaks {
            peak_24h: Some(75),
            peak_alltime: Some(4000),
        },
    ));
    let store = Arc::new(MapLookup::<StoreDetails>::empty());

    let decision = orchestrator_with(store.clone(), stats, charts, ModelBank::new())
        .process_record(&mut record)
        .await;

    // Then: no storefront call, every player count from the providers
    assert_eq!(store.call_count(), 0);
    assert_eq!(decision.state, TerminalState::Resolved);
    assert_eq!(supplied(&record, CriticalField::CurrentPlayers), Some(75.0));
    assert_eq!(supplied(&record, CriticalField::Peak24h), Some(75.0));
    assert_eq!(supplied(&record, CriticalField::PeakAlltime), Some(4000.0));
    assert_eq!(
        decision.filled.get(CriticalField::PeakAlltime).unwrap().provenance,
        Provenance::Charts
    );
}

#[tokio::test]
async fn test_model_predictions_take_precedence() {
    let mut record = no_player_counts(7).with(CriticalField::CurrentPlayers, 50u64);
    let decision = offline_orchestrator(generous_bank())
        .process_record(&mut record)
        .await;

    assert_eq!(decision.state, TerminalState::Resolved);
    assert_eq!(supplied(&record, CriticalField::Peak24h), Some(1000.0));
    assert_eq!(supplied(&record, CriticalField::PeakAlltime), Some(1000.0));
    // Present values are never overwritten
    assert_eq!(supplied(&record, CriticalField::CurrentPlayers), Some(50.0));
}

#[tokio::test]
async fn test_sparse_target_falls_back_to_heuristic() {
    // Given: reference data where only 5 rows have a positive peak_24h
    let reference: Vec<Record> = (0..12u64)
        .map(|i| {
            let peak_24h = if i < 5 { 200 + i * 10 } else { 0 };
            complete_record(100 + i)
                .with(CriticalField::CurrentPlayers, 40 + i * 5)
                .with(CriticalField::Peak24h, peak_24h)
                .with(CriticalField::PeakAlltime, 800 + i * 50)
        })
        .collect();
    let trainer = Trainer::new(TrainerConfig::default(), FeatureExtractor::new(REFERENCE_YEAR));
    let outcome = trainer.train(&reference);

    assert!(outcome.bank.get(PlayerTarget::Peak24h).is_none());
    assert!(outcome.bank.get(PlayerTarget::CurrentPlayers).is_some());
    assert_eq!(outcome.stats.skipped.len(), 1);
    assert_eq!(outcome.stats.skipped[0].valid_samples, 5);

    // When: a record is missing peak_24h and peak_alltime
    let mut record = complete_record(200)
        .with(CriticalField::Peak24h, 0u64)
        .with(CriticalField::PeakAlltime, 0u64);
    let decision = offline_orchestrator(outcome.bank)
        .process_record(&mut record)
        .await;

    // Then: peak_24h comes from the heuristic, the record resolves
    assert_eq!(decision.state, TerminalState::Resolved);
    let peak_24h = decision.filled.get(CriticalField::Peak24h).unwrap();
    assert_eq!(peak_24h.provenance, Provenance::Heuristic);
    assert_eq!(peak_24h.value, FieldValue::Number(250.0));
    assert!(supplied(&record, CriticalField::PeakAlltime).unwrap() > 0.0);
}

#[tokio::test]
async fn test_panicking_lookup_drops_only_that_record() {
    let store = Arc::new(PanickingStore { app_id: 9 });
    let none = Arc::new(gamerec_clean::sources::NoLookup);
    let orchestrator = orchestrator_with(store, none.clone(), none, ModelBank::new());

    let records = vec![
        complete_record(8),
        complete_record(9).with(CriticalField::Price, ""),
        complete_record(10).with(CriticalField::Price, ""),
    ];
    let outcome = orchestrator.run_batch(records).await;

    let kept: Vec<u64> = outcome.kept.iter().map(|r| r.app_id).collect();
    assert_eq!(kept, vec![8, 10]);
    assert!(matches!(
        outcome.decisions[1].drop_reason,
        Some(DropReason::UnexpectedError(_))
    ));
    assert_eq!(outcome.stats.drop_reasons["unexpected_error"], 1);
    assert_eq!(outcome.stats.salvaged, 1);
}

#[tokio::test]
async fn test_processing_is_idempotent() {
    let orchestrator = offline_orchestrator(ModelBank::new());
    let input = no_player_counts(11).with(CriticalField::Peak24h, 300u64);

    let mut first = input.clone();
    let mut second = input.clone();
    let a = orchestrator.process_record(&mut first).await;
    let b = orchestrator.process_record(&mut second).await;

    assert_eq!(a, b);
    assert_eq!(first, second);
}
