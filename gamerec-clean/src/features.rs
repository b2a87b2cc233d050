//! Feature extraction
//!
//! Derives the fixed numeric feature vector shared by training and inference.
//! Extraction is pure: the reference year is an explicit input, so the same
//! record always yields the same vector for a given extractor.

use crate::classifier::is_missing;
use crate::error::{TrainingError, TrainingResult};
use crate::types::{is_free_text, CriticalField, FieldType, FieldValue, PlayerTarget, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

static DECIMAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("valid decimal regex"));

/// Age used when the release year is unknown
pub const UNKNOWN_AGE: f64 = -1.0;

/// Named features in vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    GameAgeYears,
    IsFree,
    PriceNumeric,
    PlaytimeAvg,
    PlaytimeMedian,
    PlaytimePriceRatio,
    CurrentPlayers,
    #[serde(rename = "peak_24h")]
    Peak24h,
    PeakAlltime,
    ActivityRatio,
    HistoricalGrowth,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Feature::GameAgeYears,
        Feature::IsFree,
        Feature::PriceNumeric,
        Feature::PlaytimeAvg,
        Feature::PlaytimeMedian,
        Feature::PlaytimePriceRatio,
        Feature::CurrentPlayers,
        Feature::Peak24h,
        Feature::PeakAlltime,
        Feature::ActivityRatio,
        Feature::HistoricalGrowth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::GameAgeYears => "game_age_years",
            Feature::IsFree => "is_free",
            Feature::PriceNumeric => "price_numeric",
            Feature::PlaytimeAvg => "playtime_avg",
            Feature::PlaytimeMedian => "playtime_median",
            Feature::PlaytimePriceRatio => "playtime_price_ratio",
            Feature::CurrentPlayers => "current_players",
            Feature::Peak24h => "peak_24h",
            Feature::PeakAlltime => "peak_alltime",
            Feature::ActivityRatio => "activity_ratio",
            Feature::HistoricalGrowth => "historical_growth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Feature carrying the raw value of a player-count target
    pub fn for_target(target: PlayerTarget) -> Self {
        match target {
            PlayerTarget::CurrentPlayers => Feature::CurrentPlayers,
            PlayerTarget::Peak24h => Feature::Peak24h,
            PlayerTarget::PeakAlltime => Feature::PeakAlltime,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Features each target is trained on
///
/// Excludes the target itself and the ratios computed from it.
pub fn target_features(target: PlayerTarget) -> &'static [Feature] {
    use Feature::*;
    match target {
        PlayerTarget::CurrentPlayers => &[
            GameAgeYears,
            IsFree,
            PriceNumeric,
            PlaytimeAvg,
            PlaytimeMedian,
            PlaytimePriceRatio,
            Peak24h,
            PeakAlltime,
            HistoricalGrowth,
        ],
        PlayerTarget::Peak24h => &[
            GameAgeYears,
            IsFree,
            PriceNumeric,
            PlaytimeAvg,
            PlaytimeMedian,
            PlaytimePriceRatio,
            CurrentPlayers,
            PeakAlltime,
        ],
        PlayerTarget::PeakAlltime => &[
            GameAgeYears,
            IsFree,
            PriceNumeric,
            PlaytimeAvg,
            PlaytimeMedian,
            PlaytimePriceRatio,
            CurrentPlayers,
            Peak24h,
            ActivityRatio,
        ],
    }
}

/// Ordered feature name → value mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; 11],
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Look a feature up by its persisted name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        Feature::from_name(name).map(|f| self.get(f))
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }

    /// Copy with one feature replaced and the ratios recomputed
    pub fn with_value(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self.refresh_derived();
        self
    }

    /// Recompute the ratios that depend on the player counts
    pub fn refresh_derived(&mut self) {
        let current = self.get(Feature::CurrentPlayers);
        let peak_24h = self.get(Feature::Peak24h);
        let peak_alltime = self.get(Feature::PeakAlltime);

        let (activity, growth) = if peak_24h > 0.0 {
            (current / peak_24h, peak_alltime / peak_24h)
        } else {
            (0.0, 0.0)
        };
        self.set(Feature::ActivityRatio, activity);
        self.set(Feature::HistoricalGrowth, growth);
    }

    /// Values in the order of `names`
    ///
    /// Fails if a name is not a known feature.
    pub fn select(&self, names: &[String]) -> TrainingResult<Vec<f64>> {
        names
            .iter()
            .map(|name| {
                self.value_of(name)
                    .ok_or_else(|| TrainingError::UnknownFeature(name.clone()))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

/// Extracts feature vectors relative to a fixed reference year
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    reference_year: i32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(gamerec_common::time::current_year())
    }
}

impl FeatureExtractor {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn extract(&self, record: &Record) -> FeatureVector {
        let mut vector = FeatureVector { values: [0.0; 11] };

        vector.set(
            Feature::GameAgeYears,
            self.game_age_years(record.get(CriticalField::ReleaseDate)),
        );

        let price = record.get(CriticalField::Price);
        let is_free = price.as_text().map(|t| is_free_text(&t)).unwrap_or(false);
        vector.set(Feature::IsFree, if is_free { 1.0 } else { 0.0 });
        let price_numeric = if is_free { 0.0 } else { price_numeric(price) };
        vector.set(Feature::PriceNumeric, price_numeric);

        let playtime_avg = count_or_zero(record, CriticalField::PlaytimeAvg);
        vector.set(Feature::PlaytimeAvg, playtime_avg);
        vector.set(
            Feature::PlaytimeMedian,
            count_or_zero(record, CriticalField::PlaytimeMedian),
        );
        // Unpriced games fall back to the raw playtime
        let ratio = if price_numeric > 0.0 {
            playtime_avg / price_numeric
        } else {
            playtime_avg
        };
        vector.set(Feature::PlaytimePriceRatio, ratio);

        vector.set(
            Feature::CurrentPlayers,
            count_or_zero(record, CriticalField::CurrentPlayers),
        );
        vector.set(Feature::Peak24h, count_or_zero(record, CriticalField::Peak24h));
        vector.set(
            Feature::PeakAlltime,
            count_or_zero(record, CriticalField::PeakAlltime),
        );
        vector.refresh_derived();

        vector
    }

    fn game_age_years(&self, release: &FieldValue) -> f64 {
        if is_missing(release, FieldType::ReleaseDate) {
            return UNKNOWN_AGE;
        }
        let Some(text) = release.as_text() else {
            return UNKNOWN_AGE;
        };
        YEAR_PATTERN
            .find(&text)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .map(|year| (self.reference_year - year).max(0) as f64)
            .unwrap_or(UNKNOWN_AGE)
    }
}

/// First decimal number in the price text (0.0 if none)
fn price_numeric(price: &FieldValue) -> f64 {
    if let FieldValue::Number(n) = price {
        return if n.is_finite() { *n } else { 0.0 };
    }
    price
        .as_text()
        .and_then(|text| {
            DECIMAL_PATTERN
                .find(&text)
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .unwrap_or(0.0)
}

/// Numeric value of a field, 0.0 when absent or unparseable
fn count_or_zero(record: &Record, field: CriticalField) -> f64 {
    record.number(field).unwrap_or(0.0)
}
