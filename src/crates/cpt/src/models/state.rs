//! Workflow instance state vocabulary
//!
//! The engine stores a state as an integer index into a fixed, ordered list
//! of names. `ALL` is only meaningful as a query wildcard and is never stored.

use crate::error::{CptError, Result};
use std::fmt;
use std::str::FromStr;

/// Concrete state of a persisted workflow instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// Waiting in the queue for a processor
    Enqueued = 0,
    /// Currently being executed by an engine
    Processing = 1,
    /// Suspended until responses arrive
    Waiting = 2,
    /// Completed normally
    Finished = 3,
    /// Marked invalid by the engine
    Invalid = 4,
    /// Failed; an error row is attached
    Error = 5,
}

impl WorkflowState {
    /// All concrete states in storage order
    pub const VALUES: [WorkflowState; 6] = [
        Self::Enqueued,
        Self::Processing,
        Self::Waiting,
        Self::Finished,
        Self::Invalid,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "ENQUEUED",
            Self::Processing => "PROCESSING",
            Self::Waiting => "WAITING",
            Self::Finished => "FINISHED",
            Self::Invalid => "INVALID",
            Self::Error => "ERROR",
        }
    }

    /// Storage index of this state
    pub fn index(&self) -> i32 {
        *self as i32
    }

    /// Case-insensitive lookup of a state name, `None` when the name is unknown
    pub fn index_of(name: &str) -> Option<usize> {
        Self::VALUES
            .iter()
            .position(|state| state.as_str().eq_ignore_ascii_case(name))
    }

    /// Symbolic name for a storage index
    pub fn name_of(index: i64) -> Result<&'static str> {
        Self::from_index(index).map(|state| state.as_str())
    }

    /// State for a storage index, failing outside `[0, 6)`
    pub fn from_index(index: i64) -> Result<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::VALUES.get(i).copied())
            .ok_or_else(|| {
                CptError::InvalidState(format!("state index {}", index), allowed_states())
            })
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = CptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::index_of(s)
            .map(|i| Self::VALUES[i])
            .ok_or_else(|| CptError::InvalidState(s.to_string(), allowed_states()))
    }
}

/// State filter accepted by read commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSelector {
    /// Any state
    All,
    /// Exactly one state
    Only(WorkflowState),
}

impl StateSelector {
    /// The state to constrain on, `None` for the wildcard
    pub fn state(&self) -> Option<WorkflowState> {
        match self {
            Self::All => None,
            Self::Only(state) => Some(*state),
        }
    }
}

impl Default for StateSelector {
    fn default() -> Self {
        Self::Only(WorkflowState::Error)
    }
}

impl fmt::Display for StateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Only(state) => write!(f, "{}", state),
        }
    }
}

impl FromStr for StateSelector {
    type Err = CptError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("ALL") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// Human readable list of accepted state names, wildcard included
pub fn allowed_states() -> String {
    let names: Vec<&str> = WorkflowState::VALUES
        .iter()
        .map(|state| state.as_str())
        .chain(std::iter::once("ALL"))
        .collect();
    format!("[{}]", names.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_of_index_of_round_trip() {
        for name in ["enqueued", "Processing", "WAITING", "finished", "invalid", "Error"] {
            let index = WorkflowState::index_of(name).unwrap();
            assert_eq!(
                WorkflowState::name_of(index as i64).unwrap(),
                name.to_uppercase()
            );
        }
    }

    #[test]
    fn test_storage_indices() {
        assert_eq!(WorkflowState::Enqueued.index(), 0);
        assert_eq!(WorkflowState::Finished.index(), 3);
        assert_eq!(WorkflowState::Error.index(), 5);
        assert_eq!(WorkflowState::index_of("error"), Some(5));
    }

    #[test]
    fn test_unknown_name_not_found() {
        assert_eq!(WorkflowState::index_of("RUNNING"), None);
        assert_eq!(WorkflowState::index_of(""), None);
        assert!("bogus".parse::<WorkflowState>().is_err());
    }

    #[test]
    fn test_wildcard_is_not_a_stored_state() {
        assert_eq!(WorkflowState::index_of("ALL"), None);
        assert!(WorkflowState::from_index(6).is_err());
    }

    #[test]
    fn test_name_of_out_of_range() {
        assert!(WorkflowState::name_of(-1).is_err());
        assert!(WorkflowState::name_of(6).is_err());
        assert!(matches!(
            WorkflowState::name_of(42),
            Err(CptError::InvalidState(_, _))
        ));
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("all".parse::<StateSelector>().unwrap(), StateSelector::All);
        assert_eq!(
            "waiting".parse::<StateSelector>().unwrap(),
            StateSelector::Only(WorkflowState::Waiting)
        );
        assert!("nope".parse::<StateSelector>().is_err());
        assert_eq!(StateSelector::default().state(), Some(WorkflowState::Error));
        assert_eq!(StateSelector::All.state(), None);
    }

    #[test]
    fn test_allowed_states_lists_wildcard() {
        let allowed = allowed_states();
        assert!(allowed.starts_with("[ENQUEUED"));
        assert!(allowed.ends_with("ALL]"));
    }
}
