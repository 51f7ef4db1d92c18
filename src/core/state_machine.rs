//! State machine for tracking the publish workflow
//!
//! Every run walks `Initial → Resolved → Parsed → Staged → Archived` and then
//! ends in `Uploaded → Done`, `Done` or `Failed`. Runs are never resumed, so
//! the history lives in memory only and is handed to the report at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publishing state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    Initial,
    Resolved,
    Parsed,
    Staged,
    Archived,
    Uploaded,
    Done,
    Failed,
}

impl PublishState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, PublishState::Done | PublishState::Failed)
    }

    /// Check whether `self → to` is a legal edge
    pub fn can_transition_to(self, to: PublishState) -> bool {
        use PublishState::*;

        if self.is_terminal() {
            return false;
        }

        match (self, to) {
            // Any live state can fail, or finish early when a gate skips.
            (_, Failed) | (_, Done) => true,
            (Initial, Resolved) => true,
            (Resolved, Parsed) => true,
            // Pre-built archives skip parsing and staging.
            (Resolved, Archived) => true,
            (Parsed, Staged) => true,
            (Staged, Archived) => true,
            (Archived, Uploaded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: PublishState,

    /// To state
    pub to: PublishState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Free-form note (e.g. the reason for a failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Rejected transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal state transition {from} → {to}")]
pub struct IllegalTransition {
    pub from: PublishState,
    pub to: PublishState,
}

/// State machine for tracking the publish workflow
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    transitions: Vec<StateTransition>,
    error: Option<String>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    /// Create a new state machine in `Initial`
    pub fn new() -> Self {
        Self {
            current_state: PublishState::Initial,
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, to: PublishState) -> Result<(), IllegalTransition> {
        self.transition_with_note(to, None)
    }

    /// Transition to a new state, attaching a note to the history entry
    pub fn transition_with_note(
        &mut self,
        to: PublishState,
        note: Option<String>,
    ) -> Result<(), IllegalTransition> {
        let from = self.current_state;
        if !from.can_transition_to(to) {
            return Err(IllegalTransition { from, to });
        }

        if to == PublishState::Failed {
            self.error = note.clone();
        }

        tracing::debug!(%from, %to, "state transition");
        self.transitions.push(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            note,
        });
        self.current_state = to;

        Ok(())
    }

    /// Move to `Failed` unless the run already ended
    pub fn fail(&mut self, reason: &str) {
        if !self.current_state.is_terminal() {
            // Failed is reachable from every live state.
            let _ = self.transition_with_note(PublishState::Failed, Some(reason.to_string()));
        }
    }

    /// Get current state
    pub fn get_state(&self) -> PublishState {
        self.current_state
    }

    /// Get recorded transitions
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get last error
    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let note = t
                    .note
                    .as_ref()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default();
                format!("{}: {:?} → {:?}{}", time, t.from, t.to, note)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_machine() {
        let state_machine = PublishStateMachine::new();

        assert_eq!(state_machine.get_state(), PublishState::Initial);
        assert!(state_machine.transitions().is_empty());
    }

    #[test]
    fn test_happy_path_upload() {
        let mut state_machine = PublishStateMachine::new();

        for state in [
            PublishState::Resolved,
            PublishState::Parsed,
            PublishState::Staged,
            PublishState::Archived,
            PublishState::Uploaded,
            PublishState::Done,
        ] {
            state_machine.transition(state).unwrap();
        }

        assert_eq!(state_machine.get_state(), PublishState::Done);
        assert_eq!(state_machine.transitions().len(), 6);
    }

    #[test]
    fn test_prebuilt_archive_skips_staging() {
        let mut state_machine = PublishStateMachine::new();

        state_machine.transition(PublishState::Resolved).unwrap();
        state_machine.transition(PublishState::Archived).unwrap();

        assert_eq!(state_machine.get_state(), PublishState::Archived);
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let mut state_machine = PublishStateMachine::new();

        let err = state_machine.transition(PublishState::Staged).unwrap_err();

        assert_eq!(err.from, PublishState::Initial);
        assert_eq!(err.to, PublishState::Staged);
        assert_eq!(state_machine.get_state(), PublishState::Initial);
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let mut state_machine = PublishStateMachine::new();
        state_machine.transition(PublishState::Done).unwrap();

        assert!(state_machine.transition(PublishState::Failed).is_err());
        assert!(state_machine.transition(PublishState::Resolved).is_err());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut state_machine = PublishStateMachine::new();
        state_machine.transition(PublishState::Resolved).unwrap();

        state_machine.fail("module 'ModuleA' not found");

        assert_eq!(state_machine.get_state(), PublishState::Failed);
        assert_eq!(
            state_machine.get_last_error(),
            Some("module 'ModuleA' not found")
        );
    }

    #[test]
    fn test_fail_after_done_is_ignored() {
        let mut state_machine = PublishStateMachine::new();
        state_machine.transition(PublishState::Done).unwrap();

        state_machine.fail("late failure");

        assert_eq!(state_machine.get_state(), PublishState::Done);
        assert!(state_machine.get_last_error().is_none());
    }

    #[test]
    fn test_get_history() {
        let mut state_machine = PublishStateMachine::new();

        state_machine.transition(PublishState::Resolved).unwrap();
        state_machine.transition(PublishState::Parsed).unwrap();

        let history = state_machine.get_history();
        assert!(history.contains("Initial → Resolved"));
        assert!(history.contains("Resolved → Parsed"));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&PublishState::Uploaded).unwrap();
        assert_eq!(json, r#""UPLOADED""#);
    }
}
