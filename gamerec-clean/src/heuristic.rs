//! Rule-based player-count estimator
//!
//! Fallback used when no trained model exists for a target or the model gives
//! no positive prediction. Player activity decays with age, so older games get
//! a lower current/peak ratio and a larger all-time/24h multiple.
//!
//! | game age (years)       | decay | all-time |
//! |------------------------|-------|----------|
//! | ≤ 2 (or unknown)       | 0.8   | 1.3      |
//! | 3–5                    | 0.5   | 2.0      |
//! | > 5                    | 0.2   | 3.5      |

use crate::features::{Feature, FeatureVector};
use crate::types::{CompletionResult, PlayerTarget, Provenance};
use tracing::debug;

/// Age-band multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeFactors {
    /// current_players / peak_24h
    pub decay: f64,
    /// peak_alltime / peak_24h
    pub alltime: f64,
}

impl AgeFactors {
    /// Factors for a game age; unknown age (negative) uses the youngest band
    pub fn for_age(game_age_years: f64) -> Self {
        if game_age_years <= 2.0 {
            Self {
                decay: 0.8,
                alltime: 1.3,
            }
        } else if game_age_years <= 5.0 {
            Self {
                decay: 0.5,
                alltime: 2.0,
            }
        } else {
            Self {
                decay: 0.2,
                alltime: 3.5,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate the `missing` targets from the ones the features carry
    ///
    /// Player counts in `features` are the known values (zero when unknown).
    /// Targets not listed in `missing` are never supplied.
    pub fn estimate(&self, features: &FeatureVector, missing: &[PlayerTarget]) -> CompletionResult {
        let mut result = CompletionResult::new();
        let factors = AgeFactors::for_age(features.get(Feature::GameAgeYears));

        let known = |feature: Feature| Some(features.get(feature)).filter(|v| *v > 0.0);
        let current = known(Feature::CurrentPlayers);
        let mut peak_24h = known(Feature::Peak24h);
        let peak_alltime = known(Feature::PeakAlltime);

        if missing.contains(&PlayerTarget::Peak24h) {
            let estimate = current
                .map(|c| c / factors.decay)
                .or_else(|| peak_alltime.map(|a| a / factors.alltime))
                .map(truncate)
                .filter(|v| *v > 0.0);
            if let Some(value) = estimate {
                result.supply(PlayerTarget::Peak24h.field(), value, Provenance::Heuristic);
            }
            peak_24h = estimate;
        }

        if let Some(peak) = peak_24h {
            if missing.contains(&PlayerTarget::CurrentPlayers) && current.is_none() {
                supply_positive(
                    &mut result,
                    PlayerTarget::CurrentPlayers,
                    truncate(peak * factors.decay),
                );
            }
            if missing.contains(&PlayerTarget::PeakAlltime) && peak_alltime.is_none() {
                supply_positive(
                    &mut result,
                    PlayerTarget::PeakAlltime,
                    truncate(peak * factors.alltime),
                );
            }
        }

        debug!(
            decay = factors.decay,
            alltime = factors.alltime,
            supplied = result.len(),
            "Heuristic estimate"
        );
        result
    }
}

fn supply_positive(result: &mut CompletionResult, target: PlayerTarget, value: f64) {
    if value > 0.0 {
        result.supply(target.field(), value, Provenance::Heuristic);
    }
}

/// Whole counts, rounded toward zero
fn truncate(value: f64) -> f64 {
    value.trunc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::types::{CriticalField, FieldValue, Record};

    fn features(age_year: &str, current: u64, peak: u64, alltime: u64) -> FeatureVector {
        let record = Record::new(1)
            .with(CriticalField::ReleaseDate, age_year)
            .with(CriticalField::CurrentPlayers, current)
            .with(CriticalField::Peak24h, peak)
            .with(CriticalField::PeakAlltime, alltime);
        FeatureExtractor::new(2024).extract(&record)
    }

    fn value(result: &CompletionResult, target: PlayerTarget) -> Option<f64> {
        result
            .get(target.field())
            .and_then(|s| match s.value {
                FieldValue::Number(n) => Some(n),
                _ => None,
            })
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(AgeFactors::for_age(-1.0).decay, 0.8);
        assert_eq!(AgeFactors::for_age(2.0).alltime, 1.3);
        assert_eq!(AgeFactors::for_age(3.0).decay, 0.5);
        assert_eq!(AgeFactors::for_age(5.0).alltime, 2.0);
        assert_eq!(AgeFactors::for_age(6.0).decay, 0.2);
    }

    #[test]
    fn test_peak_from_current_then_alltime() {
        // 2018 release, age 6: decay 0.2, all-time 3.5
        let f = features("Nov 1, 2018", 50, 0, 0);
        let result = HeuristicEstimator::new()
            .estimate(&f, &[PlayerTarget::Peak24h, PlayerTarget::PeakAlltime]);
        assert_eq!(value(&result, PlayerTarget::Peak24h), Some(250.0));
        assert_eq!(value(&result, PlayerTarget::PeakAlltime), Some(875.0));
        assert_eq!(value(&result, PlayerTarget::CurrentPlayers), None);
    }

    #[test]
    fn test_peak_from_alltime_when_no_current() {
        // age 1: decay 0.8, all-time 1.3
        let f = features("2023", 0, 0, 1000);
        let result = HeuristicEstimator::new()
            .estimate(&f, &[PlayerTarget::Peak24h, PlayerTarget::CurrentPlayers]);
        assert_eq!(value(&result, PlayerTarget::Peak24h), Some(769.0));
        assert_eq!(value(&result, PlayerTarget::CurrentPlayers), Some(615.0));
    }

    #[test]
    fn test_present_targets_not_overwritten() {
        let f = features("2020", 10, 100, 0);
        let result = HeuristicEstimator::new().estimate(&f, &[PlayerTarget::PeakAlltime]);
        assert_eq!(result.len(), 1);
        assert_eq!(value(&result, PlayerTarget::PeakAlltime), Some(200.0));
    }

    #[test]
    fn test_truncated_to_zero_is_not_supplied() {
        // 1 * 0.2 truncates to 0
        let f = features("2010", 0, 1, 0);
        let result = HeuristicEstimator::new().estimate(&f, &[PlayerTarget::CurrentPlayers]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_nothing_to_anchor_on() {
        let f = features("2010", 0, 0, 0);
        let result = HeuristicEstimator::new().estimate(&f, &PlayerTarget::ALL);
        assert!(result.is_empty());
    }
}
