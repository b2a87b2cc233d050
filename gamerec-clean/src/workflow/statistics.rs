//! Cleaning run statistics

use crate::classifier::MissingSummary;
use crate::types::{Decision, DropReason, Provenance, TerminalState};
use serde::Serialize;
use std::collections::BTreeMap;

/// Totals for one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningStats {
    pub total_records: usize,
    pub intact: usize,
    pub resolved: usize,
    pub salvaged: usize,
    pub dropped: usize,
    /// Drop count per reason kind
    pub drop_reasons: BTreeMap<String, usize>,
    /// Filled field count per supplier
    pub filled_by_provenance: BTreeMap<Provenance, usize>,
    pub missing_before: MissingSummary,
    pub missing_after: MissingSummary,
    pub elapsed_seconds: f64,
}

impl CleaningStats {
    pub fn record(&mut self, decision: &Decision) {
        self.total_records += 1;
        match decision.state {
            TerminalState::Intact => self.intact += 1,
            TerminalState::Resolved => self.resolved += 1,
            TerminalState::Salvaged => self.salvaged += 1,
            TerminalState::Dropped => self.dropped += 1,
        }
        if let Some(reason) = &decision.drop_reason {
            *self.drop_reasons.entry(reason_key(reason).to_string()).or_insert(0) += 1;
        }
        for (_, supplied) in decision.filled.iter() {
            *self.filled_by_provenance.entry(supplied.provenance).or_insert(0) += 1;
        }
    }

    pub fn kept(&self) -> usize {
        self.total_records - self.dropped
    }

    /// Share of records kept, in percent
    pub fn retention_pct(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.kept() as f64 * 100.0 / self.total_records as f64
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} records: {} intact, {} resolved, {} salvaged, {} dropped ({:.1}% kept)",
            self.total_records,
            self.intact,
            self.resolved,
            self.salvaged,
            self.dropped,
            self.retention_pct()
        )
    }
}

fn reason_key(reason: &DropReason) -> &'static str {
    match reason {
        DropReason::InsufficientSignal => "insufficient_signal",
        DropReason::Unresolved => "unresolved",
        DropReason::UnexpectedError(_) => "unexpected_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletionResult, CriticalField};

    fn decision(state: TerminalState, reason: Option<DropReason>) -> Decision {
        Decision {
            app_id: 1,
            state,
            originally_missing: vec![],
            unresolved: vec![],
            filled: CompletionResult::new(),
            drop_reason: reason,
        }
    }

    #[test]
    fn test_counts_by_state_and_reason() {
        let mut stats = CleaningStats::default();
        stats.record(&decision(TerminalState::Intact, None));
        stats.record(&decision(TerminalState::Dropped, Some(DropReason::InsufficientSignal)));
        stats.record(&decision(TerminalState::Dropped, Some(DropReason::UnexpectedError("boom".into()))));

        let mut salvaged = decision(TerminalState::Salvaged, None);
        salvaged.filled.supply(CriticalField::Price, "Free", Provenance::Salvage);
        stats.record(&salvaged);

        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.kept(), 2);
        assert_eq!(stats.drop_reasons["insufficient_signal"], 1);
        assert_eq!(stats.drop_reasons["unexpected_error"], 1);
        assert_eq!(stats.filled_by_provenance[&Provenance::Salvage], 1);
        assert_eq!(stats.retention_pct(), 50.0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = CleaningStats::default();
        assert_eq!(stats.retention_pct(), 0.0);
        assert!(stats.display_string().starts_with("0 records"));
    }
}
