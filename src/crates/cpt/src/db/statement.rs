//! Bound statements and the executor seam
//!
//! Every component builds [`Statement`]s with `$n` placeholders and bound
//! values; only the [`Executor`] knows which backend runs them.

use super::Dialect;
use crate::error::Result;
use crate::models::WorkflowState;
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// A value bound to a `$n` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Text(String),
    Int(i32),
    Timestamp(NaiveDateTime),
}

impl From<&str> for Bind {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Bind {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for Bind {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<WorkflowState> for Bind {
    fn from(state: WorkflowState) -> Self {
        Self::Int(state.index())
    }
}

impl From<NaiveDateTime> for Bind {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// SQL text plus the values for its placeholders, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    binds: Vec<Bind>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    /// Append the value for the next placeholder
    pub fn bind(mut self, value: impl Into<Bind>) -> Self {
        self.binds.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }
}

/// Issues mutating statements and reports affected row counts
#[async_trait]
pub trait Executor: Send + Sync {
    /// SQL dialect statements must be written in
    fn dialect(&self) -> Dialect;

    /// Execute one statement outside any explicit transaction
    async fn execute(&self, statement: &Statement) -> Result<u64>;
}
