//! Field classifier
//!
//! Decides whether a cell counts as missing for its semantic type.
//!
//! # Rules (in order)
//! 1. Null → missing
//! 2. Blank text, "n/a" or "nan" (trimmed, case-insensitive) → missing
//! 3. Release date: "Coming Soon" / "TBA" placeholders → missing
//! 4. Price: the free sentinel is present; any other non-blank text is present
//! 5. Numeric count: zero, unparseable or non-finite → missing
//!
//! Zero counts carry no signal, so a stored `0` is treated like an empty cell.

use crate::types::{CriticalField, FieldType, FieldValue, Record};
use serde::Serialize;
use std::collections::BTreeMap;

const NULL_MARKERS: [&str; 2] = ["n/a", "nan"];
const DATE_PLACEHOLDERS: [&str; 2] = ["coming soon", "tba"];

/// True if `value` is missing for `field_type`
pub fn is_missing(value: &FieldValue, field_type: FieldType) -> bool {
    match value {
        FieldValue::Null => true,
        FieldValue::Number(n) => match field_type {
            FieldType::NumericCount => !n.is_finite() || *n == 0.0,
            // A numeric cell in a text column still carries a value
            FieldType::ReleaseDate | FieldType::Price => !n.is_finite(),
        },
        FieldValue::Text(text) => {
            let normalized = text.trim().to_lowercase();
            if normalized.is_empty() || NULL_MARKERS.contains(&normalized.as_str()) {
                return true;
            }
            match field_type {
                FieldType::ReleaseDate => DATE_PLACEHOLDERS.contains(&normalized.as_str()),
                FieldType::Price => false,
                FieldType::NumericCount => match normalized.parse::<f64>() {
                    Ok(n) => !n.is_finite() || n == 0.0,
                    Err(_) => true,
                },
            }
        }
    }
}

/// True if the record's value for `field` is missing
pub fn is_field_missing(record: &Record, field: CriticalField) -> bool {
    is_missing(record.get(field), field.field_type())
}

/// Missing critical fields in fixed field order
pub fn missing_fields(record: &Record) -> Vec<CriticalField> {
    CriticalField::ALL
        .into_iter()
        .filter(|field| is_field_missing(record, *field))
        .collect()
}

/// Per-field missing tallies over a set of records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissingSummary {
    pub total_records: usize,
    /// Records with at least one missing critical field
    pub incomplete_records: usize,
    pub per_field: BTreeMap<CriticalField, usize>,
}

impl MissingSummary {
    pub fn missing(&self, field: CriticalField) -> usize {
        self.per_field.get(&field).copied().unwrap_or(0)
    }

    /// Log the summary under `label`
    pub fn log(&self, label: &str) {
        tracing::info!(
            label,
            total = self.total_records,
            incomplete = self.incomplete_records,
            "Data quality summary"
        );
        for (field, count) in &self.per_field {
            if *count > 0 {
                let pct = *count as f64 * 100.0 / self.total_records.max(1) as f64;
                tracing::info!(label, field = %field, missing = count, pct = %format!("{:.1}", pct), "Missing field");
            }
        }
    }
}

/// Tally missing critical fields across `records`
pub fn missing_counts<'a, I>(records: I) -> MissingSummary
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut summary = MissingSummary::default();
    for field in CriticalField::ALL {
        summary.per_field.insert(field, 0);
    }

    for record in records {
        summary.total_records += 1;
        let missing = missing_fields(record);
        if !missing.is_empty() {
            summary.incomplete_records += 1;
        }
        for field in missing {
            *summary.per_field.entry(field).or_insert(0) += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_null_and_blank_are_missing_for_every_type() {
        for field_type in [FieldType::ReleaseDate, FieldType::Price, FieldType::NumericCount] {
            assert!(is_missing(&FieldValue::Null, field_type));
            assert!(is_missing(&text(""), field_type));
            assert!(is_missing(&text("   "), field_type));
            assert!(is_missing(&text(" N/A "), field_type));
            assert!(is_missing(&text("NaN"), field_type));
        }
    }

    #[test]
    fn test_release_date_placeholders() {
        assert!(is_missing(&text("Coming Soon"), FieldType::ReleaseDate));
        assert!(is_missing(&text("tba"), FieldType::ReleaseDate));
        assert!(!is_missing(&text("Nov 1, 2018"), FieldType::ReleaseDate));
        // Placeholders only apply to dates
        assert!(!is_missing(&text("TBA"), FieldType::Price));
    }

    #[test]
    fn test_free_price_is_present() {
        assert!(!is_missing(&text("Free"), FieldType::Price));
        assert!(!is_missing(&text("免费"), FieldType::Price));
        assert!(!is_missing(&text("¥ 58.00"), FieldType::Price));
    }

    #[test]
    fn test_numeric_count_zero_is_missing() {
        assert!(is_missing(&FieldValue::Number(0.0), FieldType::NumericCount));
        assert!(is_missing(&text("0"), FieldType::NumericCount));
        assert!(is_missing(&text("lots"), FieldType::NumericCount));
        assert!(is_missing(&FieldValue::Number(f64::NAN), FieldType::NumericCount));
        assert!(!is_missing(&FieldValue::Number(1.0), FieldType::NumericCount));
        assert!(!is_missing(&text(" 12 "), FieldType::NumericCount));
    }

    #[test]
    fn test_missing_fields_in_field_order() {
        let record = Record::new(10)
            .with(CriticalField::ReleaseDate, "Coming Soon")
            .with(CriticalField::Price, "Free")
            .with(CriticalField::PlaytimeAvg, 10u64)
            .with(CriticalField::PlaytimeMedian, 5u64)
            .with(CriticalField::CurrentPlayers, 0u64)
            .with(CriticalField::Peak24h, 3u64);

        assert_eq!(
            missing_fields(&record),
            vec![
                CriticalField::ReleaseDate,
                CriticalField::CurrentPlayers,
                CriticalField::PeakAlltime
            ]
        );
    }

    #[test]
    fn test_missing_counts() {
        let complete = Record::new(1)
            .with(CriticalField::ReleaseDate, "2020")
            .with(CriticalField::Price, "Free")
            .with(CriticalField::PlaytimeAvg, 1u64)
            .with(CriticalField::PlaytimeMedian, 1u64)
            .with(CriticalField::CurrentPlayers, 1u64)
            .with(CriticalField::Peak24h, 1u64)
            .with(CriticalField::PeakAlltime, 1u64);
        let mut partial = complete.clone();
        partial.set(CriticalField::Price, FieldValue::Null);

        let summary = missing_counts([&complete, &partial]);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.incomplete_records, 1);
        assert_eq!(summary.missing(CriticalField::Price), 1);
        assert_eq!(summary.missing(CriticalField::Peak24h), 0);
    }
}
