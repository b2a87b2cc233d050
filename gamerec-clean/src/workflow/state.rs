//! Per-record completion state machine
//!
//! Intact → MissingDetected → PartiallyCompleted → Estimating → Resolved | Salvaged | Dropped
//!
//! The transition policies are plain functions over field lists so they can be
//! exercised without any lookups.

use crate::types::{CriticalField, PlayerTarget, TerminalState};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Record completion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// No critical field missing
    Intact,
    /// At least one critical field missing, nothing fetched yet
    MissingDetected,
    /// External completion applied
    PartiallyCompleted,
    /// Some, but not all, player counts being estimated
    Estimating,
    Resolved,
    Salvaged,
    Dropped,
}

impl RecordState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecordState::Intact | RecordState::Resolved | RecordState::Salvaged | RecordState::Dropped
        )
    }

    /// Terminal state reported in the decision, if this is one
    pub fn terminal(self) -> Option<TerminalState> {
        match self {
            RecordState::Intact => Some(TerminalState::Intact),
            RecordState::Resolved => Some(TerminalState::Resolved),
            RecordState::Salvaged => Some(TerminalState::Salvaged),
            RecordState::Dropped => Some(TerminalState::Dropped),
            _ => None,
        }
    }
}

/// State transition event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub app_id: u64,
    pub old_state: RecordState,
    pub new_state: RecordState,
}

/// One record's path through the state machine
#[derive(Debug, Clone)]
pub struct RecordSession {
    pub app_id: u64,
    pub state: RecordState,
    pub transitions: Vec<StateTransition>,
}

impl RecordSession {
    /// Start in `MissingDetected` when anything is missing, else `Intact`
    pub fn new(app_id: u64, missing: &[CriticalField]) -> Self {
        Self {
            app_id,
            state: if missing.is_empty() {
                RecordState::Intact
            } else {
                RecordState::MissingDetected
            },
            transitions: Vec::new(),
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: RecordState) -> StateTransition {
        let transition = StateTransition {
            app_id: self.app_id,
            old_state: self.state,
            new_state,
        };
        trace!(
            app_id = self.app_id,
            from = ?transition.old_state,
            to = ?new_state,
            "Record state transition"
        );
        self.state = new_state;
        self.transitions.push(transition);
        transition
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Price was the only gap and completion could not fill it
pub fn salvage_price_only(
    originally_missing: &[CriticalField],
    still_missing: &[CriticalField],
) -> bool {
    originally_missing == [CriticalField::Price] && still_missing.contains(&CriticalField::Price)
}

/// Player-count cluster after external completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterStatus {
    Complete,
    /// These targets are missing, at least one is known
    Partial(Vec<PlayerTarget>),
    /// Nothing to anchor an estimate on
    AllMissing,
}

impl ClusterStatus {
    pub fn of(still_missing: &[CriticalField]) -> Self {
        let targets: Vec<PlayerTarget> = PlayerTarget::ALL
            .into_iter()
            .filter(|t| still_missing.contains(&t.field()))
            .collect();
        match targets.len() {
            0 => ClusterStatus::Complete,
            n if n == PlayerTarget::ALL.len() => ClusterStatus::AllMissing,
            _ => ClusterStatus::Partial(targets),
        }
    }
}

/// Verdict once every completion attempt has run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalOutcome {
    Resolved,
    /// Only price left; fill with the free sentinel
    SalvagePrice,
    Drop,
}

impl FinalOutcome {
    pub fn of(unresolved: &[CriticalField]) -> Self {
        match unresolved {
            [] => FinalOutcome::Resolved,
            [CriticalField::Price] => FinalOutcome::SalvagePrice,
            _ => FinalOutcome::Drop,
        }
    }
}
