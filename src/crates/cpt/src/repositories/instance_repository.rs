//! Read access to workflow instances, their errors and audit trails

use crate::audit::decode_message;
use crate::db::{Database, Statement};
use crate::error::{CptError, Result};
use crate::filter::{json_selector_clause, BrokenFilter};
use crate::models::{AuditEntry, AuditTrail, AuditTrailRow, StateSelector, WorkflowInstance};
use std::sync::Arc;
use tracing::debug;

const BROKEN_JOIN: &str = "FROM cop_workflow_instance_error e, cop_workflow_instance i \
                           WHERE e.workflow_instance_id = i.id";

/// Repository for workflow instance queries
#[derive(Clone, Debug)]
pub struct InstanceRepository {
    db: Arc<Database>,
}

impl InstanceRepository {
    /// Create a new instance repository
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Number of instances in the selected state
    pub async fn count(&self, selector: StateSelector) -> Result<i64> {
        let statement = match selector.state() {
            None => Statement::new("SELECT count(id) FROM cop_workflow_instance"),
            Some(state) => {
                Statement::new("SELECT count(id) FROM cop_workflow_instance WHERE state = $1")
                    .bind(state)
            }
        };

        self.db
            .fetch_count(&statement)
            .await
            .map_err(|e| CptError::Database(format!("Error reading count: {}", e)))
    }

    /// Number of error rows matching `filter`
    pub async fn count_broken(&self, filter: &BrokenFilter) -> Result<i64> {
        let base = Statement::new(format!("SELECT count(e.workflow_instance_id) {}", BROKEN_JOIN));
        let statement = filter.compose()?.extend(base);

        self.db.fetch_count(&statement).await.map_err(|e| {
            CptError::Database(format!("Workflow instance error count failed: {}", e))
        })
    }

    /// Ids of instances with an error row matching `filter`
    pub async fn find_broken(&self, filter: &BrokenFilter) -> Result<Vec<String>> {
        let base = Statement::new(format!("SELECT e.workflow_instance_id {}", BROKEN_JOIN));
        let statement = filter.compose()?.extend(base);

        self.db.fetch_strings(&statement).await.map_err(|e| {
            CptError::Database(format!("Workflow instance error search failed: {}", e))
        })
    }

    /// Ids of instances whose JSON data satisfies `selector`
    ///
    /// The selector is embedded as written and may refer to the `json`,
    /// `id` and `state` columns.
    pub async fn find_by_json(&self, selector: &str, state: StateSelector) -> Result<Vec<String>> {
        let clause = json_selector_clause(selector)?;
        let projection = format!(
            "SELECT id FROM (SELECT id, state, {} AS json FROM cop_workflow_instance) AS r WHERE ",
            self.db.dialect().json_projection()
        );

        let statement = match state.state() {
            None => Statement::new(format!("{}{}", projection, clause)),
            Some(state) => {
                Statement::new(format!("{}state = $1 AND {}", projection, clause)).bind(state)
            }
        };

        self.db
            .fetch_strings(&statement)
            .await
            .map_err(|e| CptError::Database(format!("Query Error: {}", e)))
    }

    /// Load one instance, `None` when the id does not exist
    pub async fn find_by_id(&self, id: &str) -> Result<Option<WorkflowInstance>> {
        let statement = Statement::new(
            "SELECT id, CAST(state AS INTEGER) AS state, CAST(priority AS INTEGER) AS priority,
                    ppool_id AS pool_id, CAST(cs_waitmode AS INTEGER) AS wait_mode,
                    CAST(min_numb_of_resp AS INTEGER) AS min_responses,
                    CAST(numb_of_waits AS INTEGER) AS num_waits, timeout,
                    creation_ts AS creation_time, last_mod_ts AS last_modified,
                    classname AS class_name, data
             FROM cop_workflow_instance WHERE id = $1",
        )
        .bind(id);

        self.db
            .fetch_optional_as(&statement)
            .await
            .map_err(|e| CptError::Database(format!("Failed to load workflow instance {}: {}", id, e)))
    }

    /// Decoded audit trail of an instance, oldest first
    ///
    /// Entries whose message cannot be decoded are left out and counted.
    pub async fn audit_trail(&self, id: &str) -> Result<AuditTrail> {
        let statement = Statement::new(
            "SELECT long_message AS message, occurrence FROM cop_audit_trail_event
             WHERE instance_id = $1 ORDER BY occurrence",
        )
        .bind(id);

        let rows: Vec<AuditTrailRow> = self
            .db
            .fetch_all_as(&statement)
            .await
            .map_err(|e| CptError::Database(format!("Failed to load audit trail: {}", e)))?;

        let mut trail = AuditTrail::default();
        for row in rows {
            match decode_message(&row.message) {
                Ok(message) => trail.entries.push(AuditEntry {
                    occurrence: row.occurrence,
                    message,
                }),
                Err(e) => {
                    debug!(id = %id, error = %e, "Skipping undecodable audit entry");
                    trail.undecodable += 1;
                }
            }
        }

        Ok(trail)
    }
}
