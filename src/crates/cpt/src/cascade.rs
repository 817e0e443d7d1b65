//! Cascading mutations over workflow instances
//!
//! Delete, restart and cleanup are ordered lists of [`CascadeStep`]s issued
//! one statement at a time, without a surrounding transaction. Every step
//! yields its own outcome. A failing step either lets the sequence continue
//! or skips the rest of the sequence for that id; one id never stops the
//! next.

use crate::db::{Dialect, Executor, Statement};
use crate::error::{CptError, Result};
use crate::models::WorkflowState;
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

/// What a failing step does to the remaining steps of its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    Continue,
    SkipRest,
}

/// One statement of a cascade
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStep {
    pub label: &'static str,
    pub statement: Statement,
    pub on_failure: OnFailure,
}

impl CascadeStep {
    fn new(label: &'static str, statement: Statement, on_failure: OnFailure) -> Self {
        Self {
            label,
            statement,
            on_failure,
        }
    }
}

/// Result of a single issued step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub label: &'static str,
    /// Affected rows, or the error message
    pub result: std::result::Result<u64, String>,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of every step issued for one id
#[derive(Debug, Clone, PartialEq)]
pub struct IdReport {
    pub id: String,
    pub outcomes: Vec<StepOutcome>,
    /// A `SkipRest` step failed and later steps were not issued
    pub skipped: bool,
}

impl IdReport {
    /// Every step was issued, whatever its outcome
    pub fn is_processed(&self) -> bool {
        !self.skipped
    }

    pub fn is_success(&self) -> bool {
        !self.skipped && self.outcomes.iter().all(StepOutcome::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }
}

/// Per-id reports of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub operation: &'static str,
    pub reports: Vec<IdReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn processed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_processed()).count()
    }

    /// Fail only when every id of a non-empty batch was skipped
    pub fn into_result(self) -> Result<Self> {
        if !self.reports.is_empty() && self.processed() == 0 {
            return Err(CptError::Batch(format!(
                "{} skipped all {} workflow instances",
                self.operation,
                self.reports.len()
            )));
        }
        Ok(self)
    }
}

/// Which record sets a cleanup purges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupTargets {
    pub workflow_instances: bool,
    pub audit_trail: bool,
}

/// Steps removing one instance and the rows referencing it
pub fn delete_plan(dialect: Dialect, id: &str) -> Vec<CascadeStep> {
    use OnFailure::*;

    vec![
        CascadeStep::new(
            "lock",
            Statement::new(format!(
                "SELECT 1 FROM cop_workflow_instance WHERE id = $1{}",
                dialect.row_lock_suffix()
            ))
            .bind(id),
            SkipRest,
        ),
        CascadeStep::new(
            "COP_RESPONSE",
            Statement::new(
                "DELETE FROM cop_response WHERE correlation_id IN \
                 (SELECT correlation_id FROM cop_wait WHERE workflow_instance_id = $1)",
            )
            .bind(id),
            Continue,
        ),
        CascadeStep::new(
            "COP_WAIT",
            Statement::new("DELETE FROM cop_wait WHERE workflow_instance_id = $1").bind(id),
            Continue,
        ),
        CascadeStep::new(
            "COP_WORKFLOW_INSTANCE_ERROR",
            Statement::new("DELETE FROM cop_workflow_instance_error WHERE workflow_instance_id = $1")
                .bind(id),
            Continue,
        ),
        CascadeStep::new(
            "COP_WORKFLOW_INSTANCE",
            Statement::new("DELETE FROM cop_workflow_instance WHERE id = $1").bind(id),
            Continue,
        ),
    ]
}

/// Steps putting a finished or broken instance back on the queue
///
/// The enqueue guard matches FINISHED or ERROR. The state reset guard
/// matches ERROR twice, so FINISHED instances are queued but keep their
/// state.
pub fn restart_plan(id: &str, now: NaiveDateTime) -> Vec<CascadeStep> {
    use OnFailure::*;

    vec![
        CascadeStep::new(
            "enqueue",
            Statement::new(
                "INSERT INTO cop_queue (ppool_id, priority, last_mod_ts, workflow_instance_id) \
                 SELECT ppool_id, priority, $1, id FROM cop_workflow_instance \
                 WHERE id = $2 AND (state = $3 OR state = $4)",
            )
            .bind(now)
            .bind(id)
            .bind(WorkflowState::Finished)
            .bind(WorkflowState::Error),
            SkipRest,
        ),
        CascadeStep::new(
            "reset",
            Statement::new(
                "UPDATE cop_workflow_instance SET state = $1, last_mod_ts = $2 \
                 WHERE id = $3 AND (state = $4 OR state = $5)",
            )
            .bind(WorkflowState::Enqueued)
            .bind(now)
            .bind(id)
            .bind(WorkflowState::Error)
            .bind(WorkflowState::Error),
            SkipRest,
        ),
        CascadeStep::new(
            "COP_WORKFLOW_INSTANCE_ERROR",
            Statement::new("DELETE FROM cop_workflow_instance_error WHERE workflow_instance_id = $1")
                .bind(id),
            Continue,
        ),
    ]
}

/// Steps purging rows older than `cutoff`
pub fn cleanup_plan(cutoff: NaiveDateTime, targets: CleanupTargets) -> Vec<CascadeStep> {
    const EXPIRED_INSTANCES: &str =
        "(SELECT id FROM cop_workflow_instance WHERE creation_ts < $1)";

    let mut statements: Vec<(&'static str, String)> = Vec::new();

    if targets.workflow_instances {
        statements.extend([
            (
                "COP_WORKFLOW_INSTANCE_ERROR",
                "DELETE FROM cop_workflow_instance_error WHERE error_ts < $1".to_string(),
            ),
            (
                "COP_RESPONSE",
                "DELETE FROM cop_response WHERE response_ts < $1".to_string(),
            ),
            (
                "COP_WAIT",
                format!("DELETE FROM cop_wait WHERE workflow_instance_id IN {}", EXPIRED_INSTANCES),
            ),
            (
                "COP_ADAPTERCALL",
                format!("DELETE FROM cop_adaptercall WHERE workflowid IN {}", EXPIRED_INSTANCES),
            ),
            (
                "COP_LOCK",
                format!("DELETE FROM cop_lock WHERE workflow_instance_id IN {}", EXPIRED_INSTANCES),
            ),
            (
                "COP_QUEUE",
                format!("DELETE FROM cop_queue WHERE workflow_instance_id IN {}", EXPIRED_INSTANCES),
            ),
            (
                "COP_WORKFLOW_INSTANCE",
                "DELETE FROM cop_workflow_instance WHERE creation_ts < $1".to_string(),
            ),
        ]);
    }

    if targets.audit_trail {
        statements.push((
            "COP_AUDIT_TRAIL_EVENT",
            "DELETE FROM cop_audit_trail_event WHERE occurrence < $1".to_string(),
        ));
    }

    statements
        .into_iter()
        .map(|(label, sql)| {
            CascadeStep::new(label, Statement::new(sql).bind(cutoff), OnFailure::Continue)
        })
        .collect()
}

/// Issue `steps` in order for `id`
pub async fn run_steps(executor: &dyn Executor, id: &str, steps: Vec<CascadeStep>) -> IdReport {
    let mut report = IdReport {
        id: id.to_string(),
        outcomes: Vec::with_capacity(steps.len()),
        skipped: false,
    };

    for step in steps {
        let result = executor
            .execute(&step.statement)
            .await
            .map_err(|e| e.to_string());

        match &result {
            Ok(rows) => debug!(id = %id, step = step.label, rows, "Step completed"),
            Err(e) => warn!(id = %id, step = step.label, error = %e, "Step failed"),
        }

        let failed = result.is_err();
        report.outcomes.push(StepOutcome {
            label: step.label,
            result,
        });

        if failed && step.on_failure == OnFailure::SkipRest {
            report.skipped = true;
            break;
        }
    }

    report
}

/// Delete every id together with its dependent rows
pub async fn delete(executor: &dyn Executor, ids: &[String]) -> BatchReport {
    let mut batch = BatchReport {
        operation: "delete",
        reports: Vec::with_capacity(ids.len()),
    };

    for id in ids {
        let plan = delete_plan(executor.dialect(), id);
        batch.reports.push(run_steps(executor, id, plan).await);
    }

    info!(succeeded = batch.succeeded(), failed = batch.failed(), "Delete finished");
    batch
}

/// Restart every id, stamping queue and instance rows with `now`
pub async fn restart(executor: &dyn Executor, ids: &[String], now: NaiveDateTime) -> BatchReport {
    let mut batch = BatchReport {
        operation: "restart",
        reports: Vec::with_capacity(ids.len()),
    };

    for id in ids {
        batch.reports.push(run_steps(executor, id, restart_plan(id, now)).await);
    }

    info!(succeeded = batch.succeeded(), failed = batch.failed(), "Restart finished");
    batch
}

/// Purge rows older than `cutoff`; failures are logged, never raised
pub async fn cleanup(
    executor: &dyn Executor,
    cutoff: NaiveDateTime,
    targets: CleanupTargets,
) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();

    for step in cleanup_plan(cutoff, targets) {
        let result = executor
            .execute(&step.statement)
            .await
            .map_err(|e| e.to_string());

        match &result {
            Ok(rows) => debug!(step = step.label, rows, "Purged expired rows"),
            Err(e) => debug!(step = step.label, error = %e, "Purge step failed"),
        }

        outcomes.push(StepOutcome {
            label: step.label,
            result,
        });
    }

    outcomes
}
