//! Common test utilities and setup

#![allow(dead_code)]

use chrono::{Duration, Local, NaiveDateTime};
use cpt::db::{Database, Executor, Statement};
use cpt::WorkflowState;
use std::sync::Arc;
use tempfile::TempDir;

const SCHEMA: &str = include_str!("../fixtures/copper_schema.sql");

pub const WORKFLOW_CLASS: &str = "org.copperengine.wf.OrderWorkflow";

/// SQLite copy of the engine schema in a temporary directory
pub struct TestStore {
    _dir: TempDir,
    pub url: String,
    pub db: Arc<Database>,
}

/// Create an empty store with the engine tables
pub async fn setup_store() -> TestStore {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("copper.db").display());

    let db = Database::connect_url(&url)
        .await
        .expect("Failed to create test database");

    for sql in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        db.execute(&Statement::new(sql))
            .await
            .expect("Failed to create schema");
    }

    TestStore {
        _dir: dir,
        url,
        db: Arc::new(db),
    }
}

pub fn hours_ago(hours: i64) -> NaiveDateTime {
    Local::now().naive_local() - Duration::hours(hours)
}

impl TestStore {
    pub async fn exec(&self, statement: Statement) {
        self.db.execute(&statement).await.expect("Failed to run fixture statement");
    }

    /// Insert an instance created `age_hours` ago
    pub async fn insert_instance(&self, id: &str, state: WorkflowState, age_hours: i64, data: Option<&str>) {
        self.insert_instance_at(id, state, hours_ago(age_hours), data).await;
    }

    pub async fn insert_instance_at(
        &self,
        id: &str,
        state: WorkflowState,
        created: NaiveDateTime,
        data: Option<&str>,
    ) {
        let data_value = if data.is_some() { "$6" } else { "NULL" };
        let mut statement = Statement::new(format!(
            "INSERT INTO cop_workflow_instance (id, state, priority, last_mod_ts, ppool_id, \
             cs_waitmode, min_numb_of_resp, numb_of_waits, timeout, creation_ts, classname, data) \
             VALUES ($1, $2, 5, $3, 'P#DEFAULT', 1, 1, 0, NULL, $4, $5, {})",
            data_value
        ))
        .bind(id)
        .bind(state)
        .bind(created)
        .bind(created)
        .bind(WORKFLOW_CLASS);

        if let Some(data) = data {
            statement = statement.bind(data);
        }
        self.exec(statement).await;
    }

    pub async fn insert_error(&self, id: &str, exception: &str, error_ts: NaiveDateTime) {
        self.exec(
            Statement::new(
                "INSERT INTO cop_workflow_instance_error (workflow_instance_id, exception, error_ts) \
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(exception)
            .bind(error_ts),
        )
        .await;
    }

    /// Wait, response, queue, lock and adapter-call rows referencing `id`
    pub async fn insert_dependents(&self, id: &str, age_hours: i64) {
        let ts = hours_ago(age_hours);
        let correlation = format!("corr-{}", id);

        self.exec(
            Statement::new("INSERT INTO cop_wait (correlation_id, workflow_instance_id) VALUES ($1, $2)")
                .bind(correlation.as_str())
                .bind(id),
        )
        .await;
        self.exec(
            Statement::new(
                "INSERT INTO cop_response (response_id, correlation_id, response_ts) VALUES ($1, $2, $3)",
            )
            .bind(format!("resp-{}", id))
            .bind(correlation)
            .bind(ts),
        )
        .await;
        self.exec(
            Statement::new(
                "INSERT INTO cop_queue (ppool_id, priority, last_mod_ts, workflow_instance_id) \
                 VALUES ('P#DEFAULT', 5, $1, $2)",
            )
            .bind(ts)
            .bind(id),
        )
        .await;
        self.exec(
            Statement::new("INSERT INTO cop_lock (lock_id, workflow_instance_id) VALUES ($1, $2)")
                .bind(format!("lock-{}", id))
                .bind(id),
        )
        .await;
        self.exec(
            Statement::new("INSERT INTO cop_adaptercall (workflowid, entityid) VALUES ($1, $2)")
                .bind(id)
                .bind(format!("entity-{}", id)),
        )
        .await;
    }

    pub async fn insert_audit(&self, id: &str, message: &str, occurrence: NaiveDateTime) {
        self.exec(
            Statement::new(
                "INSERT INTO cop_audit_trail_event (occurrence, instance_id, long_message) \
                 VALUES ($1, $2, $3)",
            )
            .bind(occurrence)
            .bind(id)
            .bind(message),
        )
        .await;
    }

    /// Number of rows in `table` whose `column` equals `id`
    pub async fn count_for(&self, table: &str, column: &str, id: &str) -> i64 {
        self.db
            .fetch_count(
                &Statement::new(format!("SELECT count(*) FROM {} WHERE {} = $1", table, column))
                    .bind(id),
            )
            .await
            .expect("Failed to count rows")
    }

    pub async fn count_all(&self, table: &str) -> i64 {
        self.db
            .fetch_count(&Statement::new(format!("SELECT count(*) FROM {}", table)))
            .await
            .expect("Failed to count rows")
    }

    /// Rows referencing `id` across the instance table and every dependent table
    pub async fn rows_referencing(&self, id: &str) -> i64 {
        let correlation = format!("corr-{}", id);
        self.count_for("cop_workflow_instance", "id", id).await
            + self.count_for("cop_workflow_instance_error", "workflow_instance_id", id).await
            + self.count_for("cop_wait", "workflow_instance_id", id).await
            + self.count_for("cop_response", "correlation_id", &correlation).await
    }

    pub async fn state_of(&self, id: &str) -> i64 {
        self.db
            .fetch_count(
                &Statement::new("SELECT CAST(state AS BIGINT) FROM cop_workflow_instance WHERE id = $1")
                    .bind(id),
            )
            .await
            .expect("Failed to read state")
    }
}
