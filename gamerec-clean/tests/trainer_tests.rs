//! Training, persistence and reload of the model bank

mod helpers;

use gamerec_clean::features::FeatureExtractor;
use gamerec_clean::ml::bank::model_path;
use gamerec_clean::ml::{load_model_bank, ModelBank};
use gamerec_clean::training::stats::STATS_FILE_NAME;
use gamerec_clean::training::{Trainer, TrainerConfig, TrainingStats};
use gamerec_clean::types::{CriticalField, PlayerTarget, Record};
use helpers::*;
use tempfile::TempDir;

/// Reference rows where peak_24h tracks current_players closely
fn reference(n: u64) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let current = 20 + i * 7;
            let peak_24h = current * 5;
            let peak_alltime = peak_24h * 4 + (i % 7) * 13;
            complete_record(1000 + i)
                .with(CriticalField::PlaytimeAvg, 300 + (i % 5) * 40)
                .with(CriticalField::PlaytimeMedian, 100 + (i % 3) * 25)
                .with(CriticalField::CurrentPlayers, current)
                .with(CriticalField::Peak24h, peak_24h)
                .with(CriticalField::PeakAlltime, peak_alltime)
        })
        .collect()
}

fn small_config() -> TrainerConfig {
    let mut config = TrainerConfig::default();
    config.params.forest.n_trees = 15;
    config.params.boosting.n_rounds = 30;
    config
}

#[test]
fn test_train_selects_best_candidate_per_target() {
    let trainer = Trainer::new(small_config(), FeatureExtractor::new(REFERENCE_YEAR));
    let outcome = trainer.train(&reference(40));

    assert_eq!(outcome.bank.len(), 3);
    assert!(outcome.stats.skipped.is_empty());
    assert_eq!(outcome.stats.reference_records, 40);

    for (target, stats) in &outcome.stats.targets {
        assert_eq!(stats.train_samples + stats.test_samples, 40, "{}", target);
        assert_eq!(stats.test_samples, 8);
        assert_eq!(stats.candidates.len(), 3);
        let best = stats
            .candidates
            .iter()
            .map(|c| c.test.mae)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(stats.test_mae, best);
        let importances: Vec<f64> = stats.feature_importance.iter().map(|f| f.importance).collect();
        assert!(importances.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_saved_bank_reloads_with_same_predictions() {
    let dir = TempDir::new().unwrap();
    let extractor = FeatureExtractor::new(REFERENCE_YEAR);
    let outcome = Trainer::new(small_config(), extractor).train(&reference(30));

    let written = outcome.bank.save(dir.path()).unwrap();
    let stats_path = outcome.stats.save(dir.path()).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(stats_path, dir.path().join(STATS_FILE_NAME));
    assert!(model_path(dir.path(), PlayerTarget::Peak24h).exists());

    let reloaded = load_model_bank(dir.path());
    assert_eq!(reloaded.len(), 3);

    let probe = extractor.extract(&complete_record(1).with(CriticalField::Peak24h, 0u64));
    for target in PlayerTarget::ALL {
        let before = outcome.bank.get(target).unwrap().predict(&probe).unwrap();
        let after = reloaded.get(target).unwrap().predict(&probe).unwrap();
        assert!((before - after).abs() <= 1e-6 * before.abs().max(1.0), "{}", target);
    }

    let raw = std::fs::read_to_string(stats_path).unwrap();
    let stats: TrainingStats = serde_json::from_str(&raw).unwrap();
    assert_eq!(stats.targets.len(), 3);
}

#[test]
fn test_too_few_rows_gives_empty_bank() {
    let trainer = Trainer::new(small_config(), FeatureExtractor::new(REFERENCE_YEAR));
    let outcome = trainer.train(&reference(5));

    assert_eq!(outcome.bank, ModelBank::new());
    assert_eq!(outcome.stats.skipped.len(), 3);
    assert!(outcome.stats.skipped.iter().all(|s| s.valid_samples == 5));
}
