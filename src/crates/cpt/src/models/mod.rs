//! Data models for the engine's persisted state

pub mod instance;
pub mod state;

pub use instance::{AuditEntry, AuditTrail, AuditTrailRow, WorkflowInstance};
pub use state::{allowed_states, StateSelector, WorkflowState};
