//! Core types for record completion
//!
//! Records are rows of a game dataset. Each row carries seven critical fields
//! (the ones the classifier checks) plus any number of passthrough columns that
//! are written back out untouched.
//!
//! Values are a tagged union rather than untyped cells so that classification
//! and feature extraction are total functions over every possible cell.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical spelling written when a price is salvaged as free
pub const FREE_SENTINEL: &str = "Free";

/// Accepted spellings of the free sentinel (compared case-insensitively)
pub const FREE_SPELLINGS: [&str; 2] = ["free", "免费"];

/// True if `text` is one of the free sentinel spellings
pub fn is_free_text(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    FREE_SPELLINGS.iter().any(|s| lowered == *s)
}

// ============================================================================
// Field values
// ============================================================================

/// A single cell value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Parse a raw CSV cell
    ///
    /// Empty cells become `Null`, finite numbers become `Number`, everything
    /// else is kept verbatim as `Text`.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text view of the value (numbers are formatted)
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            FieldValue::Number(n) => Some(Cow::Owned(format_number(*n))),
        }
    }

    /// Numeric view of the value
    ///
    /// Text is parsed after trimming; unparseable or non-finite values yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Null => None,
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Cell text for CSV output
    pub fn to_cell(&self) -> String {
        self.as_text().map(|s| s.into_owned()).unwrap_or_default()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Number(value as f64)
    }
}

/// Integral values print without a fractional part
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// Field metadata
// ============================================================================

/// Semantic type tag used by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    ReleaseDate,
    Price,
    NumericCount,
}

/// The fixed set of fields checked for completeness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalField {
    ReleaseDate,
    Price,
    PlaytimeAvg,
    PlaytimeMedian,
    CurrentPlayers,
    #[serde(rename = "peak_24h")]
    Peak24h,
    PeakAlltime,
}

impl CriticalField {
    /// All critical fields in dataset order
    pub const ALL: [CriticalField; 7] = [
        CriticalField::ReleaseDate,
        CriticalField::Price,
        CriticalField::PlaytimeAvg,
        CriticalField::PlaytimeMedian,
        CriticalField::CurrentPlayers,
        CriticalField::Peak24h,
        CriticalField::PeakAlltime,
    ];

    pub fn field_type(self) -> FieldType {
        match self {
            CriticalField::ReleaseDate => FieldType::ReleaseDate,
            CriticalField::Price => FieldType::Price,
            _ => FieldType::NumericCount,
        }
    }

    /// Canonical column name
    pub fn column(self) -> &'static str {
        match self {
            CriticalField::ReleaseDate => "release_date",
            CriticalField::Price => "price",
            CriticalField::PlaytimeAvg => "playtime_avg",
            CriticalField::PlaytimeMedian => "playtime_median",
            CriticalField::CurrentPlayers => "current_players",
            CriticalField::Peak24h => "peak_24h",
            CriticalField::PeakAlltime => "peak_alltime",
        }
    }

    /// Header spellings accepted in addition to the canonical name
    ///
    /// These are the localized headers of the historical dataset exports.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CriticalField::ReleaseDate => &["发行日期", "Release_Date"],
            CriticalField::Price => &["格式化价格", "Price_Formatted"],
            CriticalField::PlaytimeAvg => &["平均游戏时长(分钟)", "Average_Playtime_Forever"],
            CriticalField::PlaytimeMedian => &["中位数游戏时长(分钟)", "Median_Playtime_Forever"],
            CriticalField::CurrentPlayers => &["当前在线人数", "Current_Players"],
            CriticalField::Peak24h => &["24小时峰值", "Peak_Players_24h"],
            CriticalField::PeakAlltime => &["历史最高在线", "Peak_Players_AllTime"],
        }
    }

    /// Match a CSV header against the canonical name and aliases
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL.into_iter().find(|field| {
            field.column().eq_ignore_ascii_case(header)
                || field.aliases().iter().any(|alias| *alias == header)
        })
    }

    /// Member of the player-count cluster
    pub fn player_target(self) -> Option<PlayerTarget> {
        match self {
            CriticalField::CurrentPlayers => Some(PlayerTarget::CurrentPlayers),
            CriticalField::Peak24h => Some(PlayerTarget::Peak24h),
            CriticalField::PeakAlltime => Some(PlayerTarget::PeakAlltime),
            _ => None,
        }
    }
}

impl fmt::Display for CriticalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// The interdependent player-count trio, the only fields that are estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerTarget {
    CurrentPlayers,
    #[serde(rename = "peak_24h")]
    Peak24h,
    PeakAlltime,
}

impl PlayerTarget {
    /// Training order
    pub const ALL: [PlayerTarget; 3] = [
        PlayerTarget::CurrentPlayers,
        PlayerTarget::Peak24h,
        PlayerTarget::PeakAlltime,
    ];

    /// Estimation order: the 24h peak first, since the other two derive from it
    pub const ESTIMATION_ORDER: [PlayerTarget; 3] = [
        PlayerTarget::Peak24h,
        PlayerTarget::CurrentPlayers,
        PlayerTarget::PeakAlltime,
    ];

    pub fn field(self) -> CriticalField {
        match self {
            PlayerTarget::CurrentPlayers => CriticalField::CurrentPlayers,
            PlayerTarget::Peak24h => CriticalField::Peak24h,
            PlayerTarget::PeakAlltime => CriticalField::PeakAlltime,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.field().column()
    }
}

impl fmt::Display for PlayerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

static NULL_VALUE: FieldValue = FieldValue::Null;

/// One game row
///
/// `passthrough` holds the non-critical columns in the order the dataset
/// declared them; the dataset layer owns their headers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub app_id: u64,
    fields: BTreeMap<CriticalField, FieldValue>,
    pub passthrough: Vec<FieldValue>,
}

impl Record {
    pub fn new(app_id: u64) -> Self {
        Self {
            app_id,
            fields: BTreeMap::new(),
            passthrough: Vec::new(),
        }
    }

    /// Builder-style setter
    pub fn with(mut self, field: CriticalField, value: impl Into<FieldValue>) -> Self {
        self.set(field, value.into());
        self
    }

    /// Value of a critical field (`Null` if absent)
    pub fn get(&self, field: CriticalField) -> &FieldValue {
        self.fields.get(&field).unwrap_or(&NULL_VALUE)
    }

    pub fn set(&mut self, field: CriticalField, value: FieldValue) {
        self.fields.insert(field, value);
    }

    /// Numeric view of a critical field
    pub fn number(&self, field: CriticalField) -> Option<f64> {
        self.get(field).as_number()
    }
}

// ============================================================================
// Completion results
// ============================================================================

/// Who supplied a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Store,
    AggregateStats,
    Charts,
    Model,
    Heuristic,
    Salvage,
}

/// A value supplied by completion or estimation
#[derive(Debug, Clone, PartialEq)]
pub struct SuppliedValue {
    pub value: FieldValue,
    pub provenance: Provenance,
}

/// Field → value pairs one completion or estimation call produced
///
/// The first supplier of a field wins: `supply` never overwrites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResult {
    values: BTreeMap<CriticalField, SuppliedValue>,
}

impl CompletionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value unless the field was already supplied
    ///
    /// Returns `true` if the value was accepted.
    pub fn supply(
        &mut self,
        field: CriticalField,
        value: impl Into<FieldValue>,
        provenance: Provenance,
    ) -> bool {
        if self.values.contains_key(&field) {
            return false;
        }
        self.values.insert(
            field,
            SuppliedValue {
                value: value.into(),
                provenance,
            },
        );
        true
    }

    pub fn get(&self, field: CriticalField) -> Option<&SuppliedValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: CriticalField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CriticalField, &SuppliedValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    /// Merge another result in, keeping values already present
    pub fn merge(&mut self, other: CompletionResult) {
        for (field, supplied) in other.values {
            self.values.entry(field).or_insert(supplied);
        }
    }
}

// ============================================================================
// Decisions
// ============================================================================

/// Terminal per-record outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Completed,
    Salvaged,
    Dropped,
}

/// Terminal state reached by the completion state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// Nothing was missing
    Intact,
    /// Every missing field was filled
    Resolved,
    /// Kept via the free-price default
    Salvaged,
    Dropped,
}

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum DropReason {
    /// All three player-count fields missing after external completion
    InsufficientSignal,
    /// Critical fields left unresolved after every attempt
    Unresolved,
    /// Processing the record failed unexpectedly
    UnexpectedError(String),
}

/// Per-record decision
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub app_id: u64,
    pub state: TerminalState,
    /// Fields that were missing on entry
    pub originally_missing: Vec<CriticalField>,
    /// Fields still unresolved (non-empty only for drops)
    pub unresolved: Vec<CriticalField>,
    /// Values written into the record, with provenance
    pub filled: CompletionResult,
    pub drop_reason: Option<DropReason>,
}

impl Decision {
    pub fn verdict(&self) -> Verdict {
        match self.state {
            TerminalState::Intact | TerminalState::Resolved => Verdict::Completed,
            TerminalState::Salvaged => Verdict::Salvaged,
            TerminalState::Dropped => Verdict::Dropped,
        }
    }

    pub fn is_kept(&self) -> bool {
        self.state != TerminalState::Dropped
    }

    /// Drop decision for a record whose processing failed
    pub fn failed(app_id: u64, originally_missing: Vec<CriticalField>, error: String) -> Self {
        Self {
            app_id,
            state: TerminalState::Dropped,
            unresolved: originally_missing.clone(),
            originally_missing,
            filled: CompletionResult::new(),
            drop_reason: Some(DropReason::UnexpectedError(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cell_variants() {
        assert_eq!(FieldValue::from_cell(""), FieldValue::Null);
        assert_eq!(FieldValue::from_cell("   "), FieldValue::Null);
        assert_eq!(FieldValue::from_cell("600"), FieldValue::Number(600.0));
        assert_eq!(FieldValue::from_cell(" 1.5 "), FieldValue::Number(1.5));
        assert_eq!(
            FieldValue::from_cell("$29.99"),
            FieldValue::Text("$29.99".to_string())
        );
        // "NaN" parses as f64 but is not a finite number
        assert_eq!(FieldValue::from_cell("NaN"), FieldValue::Text("NaN".to_string()));
    }

    #[test]
    fn test_integral_numbers_format_without_fraction() {
        assert_eq!(FieldValue::Number(875.0).to_cell(), "875");
        assert_eq!(FieldValue::Number(2.5).to_cell(), "2.5");
        assert_eq!(FieldValue::Null.to_cell(), "");
    }

    #[test]
    fn test_as_number_parses_text() {
        assert_eq!(FieldValue::from("42").as_number(), Some(42.0));
        assert_eq!(FieldValue::from("abc").as_number(), None);
        assert_eq!(FieldValue::Number(f64::INFINITY).as_number(), None);
    }

    #[test]
    fn test_header_aliases() {
        assert_eq!(CriticalField::from_header("price"), Some(CriticalField::Price));
        assert_eq!(CriticalField::from_header("PEAK_24H"), Some(CriticalField::Peak24h));
        assert_eq!(
            CriticalField::from_header("历史最高在线"),
            Some(CriticalField::PeakAlltime)
        );
        assert_eq!(CriticalField::from_header("Developers"), None);
    }

    #[test]
    fn test_supply_never_overwrites() {
        let mut result = CompletionResult::new();
        assert!(result.supply(CriticalField::Peak24h, 120u64, Provenance::AggregateStats));
        assert!(!result.supply(CriticalField::Peak24h, 999u64, Provenance::Charts));

        let supplied = result.get(CriticalField::Peak24h).unwrap();
        assert_eq!(supplied.value, FieldValue::Number(120.0));
        assert_eq!(supplied.provenance, Provenance::AggregateStats);
    }

    #[test]
    fn test_free_spellings() {
        assert!(is_free_text("Free"));
        assert!(is_free_text(" FREE "));
        assert!(is_free_text("免费"));
        assert!(!is_free_text("Free to Play Bundle"));
    }

    #[test]
    fn test_decision_verdicts() {
        let failed = Decision::failed(7, vec![CriticalField::Price], "boom".to_string());
        assert_eq!(failed.verdict(), Verdict::Dropped);
        assert!(!failed.is_kept());
        assert_eq!(failed.unresolved, vec![CriticalField::Price]);
    }
}
