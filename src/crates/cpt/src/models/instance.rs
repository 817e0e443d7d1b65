//! Rows of the engine's workflow instance and audit trail tables

use crate::error::Result;
use crate::models::WorkflowState;
use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Persisted workflow instance as read from `cop_workflow_instance`
///
/// Created and mutated by the engine; this tool only reads it, transitions
/// its state or deletes it.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WorkflowInstance {
    /// Opaque instance identifier
    pub id: String,

    /// Storage index of the instance state
    pub state: i32,

    /// Queue priority
    pub priority: i32,

    /// Processor pool the instance is bound to
    pub pool_id: String,

    /// Wait mode of the current wait, if any
    pub wait_mode: Option<i32>,

    /// Minimum number of responses the current wait needs
    pub min_responses: Option<i32>,

    /// Number of outstanding waits
    pub num_waits: Option<i32>,

    /// Timeout of the current wait
    pub timeout: Option<NaiveDateTime>,

    pub creation_time: NaiveDateTime,

    pub last_modified: NaiveDateTime,

    /// Fully-qualified workflow class name
    pub class_name: String,

    /// Instance payload, JSON text when the engine is configured for it
    pub data: Option<String>,
}

impl WorkflowInstance {
    /// Symbolic state of the instance
    pub fn workflow_state(&self) -> Result<WorkflowState> {
        WorkflowState::from_index(i64::from(self.state))
    }
}

/// Raw audit trail row before transit decoding
#[derive(Debug, Clone, FromRow)]
pub struct AuditTrailRow {
    pub message: String,
    pub occurrence: NaiveDateTime,
}

/// Decoded audit trail entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub occurrence: NaiveDateTime,
    pub message: String,
}

/// Audit trail of one instance, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditTrail {
    pub entries: Vec<AuditEntry>,
    /// Stored rows left out because their message could not be decoded
    pub undecodable: usize,
}

impl AuditTrail {
    /// No rows are stored for the instance
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.undecodable == 0
    }
}
