//! `delete`, `restart` and `cleanup` command handlers

use crate::age::Age;
use crate::cascade::{self, BatchReport, CleanupTargets, IdReport, StepOutcome};
use crate::db::Database;
use crate::error::{CptError, Result};
use chrono::Local;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;

/// Delete every id and the rows referencing it
pub async fn handle_delete(db: Arc<Database>, ids: &[String]) -> Result<BatchReport> {
    let batch = cascade::delete(&*db, ids).await;
    report_failures(&batch, delete_failure);
    batch.into_result()
}

/// Put every finished or broken id back on the queue
pub async fn handle_restart(db: Arc<Database>, ids: &[String]) -> Result<BatchReport> {
    let now = Local::now().naive_local();
    let batch = cascade::restart(&*db, ids, now).await;
    report_failures(&batch, restart_failure);
    batch.into_result()
}

/// Purge rows older than `age`
pub async fn handle_cleanup(
    db: Arc<Database>,
    age: &Age,
    targets: CleanupTargets,
    out: &mut impl Write,
) -> Result<()> {
    validate_targets(targets)?;

    let cutoff = age.cutoff();
    cascade::cleanup(&*db, cutoff, targets).await;

    writeln!(out, "deleted data older than {}", cutoff)?;
    Ok(())
}

/// At least one record set must be selected for cleanup
pub fn validate_targets(targets: CleanupTargets) -> Result<()> {
    if !targets.workflow_instances && !targets.audit_trail {
        return Err(CptError::validation(
            "Use at least one of the following flags: [--audit-trail, --workflow-instance]",
        ));
    }
    Ok(())
}

fn report_failures(batch: &BatchReport, describe: fn(&IdReport, &StepOutcome) -> String) {
    for report in &batch.reports {
        for failure in report.failures() {
            eprintln!("{}", describe(report, failure).red());
        }
    }
}

fn delete_failure(report: &IdReport, outcome: &StepOutcome) -> String {
    let error = outcome.result.as_ref().err().map_or("", String::as_str);
    if outcome.label == "lock" {
        format!(
            "Error locking workflow instance id={}, skipping... ({})",
            report.id, error
        )
    } else {
        format!(
            "Error deleting workflow instance from {} id={}: {}",
            outcome.label, report.id, error
        )
    }
}

fn restart_failure(report: &IdReport, outcome: &StepOutcome) -> String {
    let error = outcome.result.as_ref().err().map_or("", String::as_str);
    if outcome.label == "COP_WORKFLOW_INSTANCE_ERROR" {
        format!(
            "Error removing workflow instance: {} from error table, {}",
            report.id, error
        )
    } else {
        format!("Error restarting workflow instance: {}, {}", report.id, error)
    }
}
