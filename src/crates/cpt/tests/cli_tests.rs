//! End-to-end tests driving the `cpt` binary

mod common;

use assert_cmd::Command;
use chrono::{Duration, Utc};
use common::{hours_ago, setup_store, TestStore};
use cpt::db::Statement;
use cpt::WorkflowState;
use predicates::prelude::*;

/// Get the `cpt` command for testing against `store`
fn cpt_cmd(store: &TestStore) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cpt"));
    // Suppress tracing output during tests
    cmd.env("RUST_LOG", "error")
        .env("DATABASE_URL", &store.url)
        .env("HOME", std::env::temp_dir())
        .env_remove("CPT_CONFIG");
    cmd
}

async fn seeded_store() -> TestStore {
    let store = setup_store().await;
    for id in ["err-1", "err-2", "err-3"] {
        store.insert_instance(id, WorkflowState::Error, 1, None).await;
    }
    store.insert_instance("fin-1", WorkflowState::Finished, 1, None).await;
    store.insert_instance("wait-1", WorkflowState::Waiting, 1, None).await;
    store
}

#[tokio::test]
async fn test_count_error_state() {
    let store = seeded_store().await;

    cpt_cmd(&store)
        .args(["count", "--state=ERROR"])
        .assert()
        .success()
        .stdout("3\n");

    cpt_cmd(&store)
        .args(["count", "--state", "all"])
        .assert()
        .success()
        .stdout("5\n");

    cpt_cmd(&store).arg("count").assert().success().stdout("3\n");
}

#[tokio::test]
async fn test_count_rejects_unknown_state() {
    let store = seeded_store().await;

    cpt_cmd(&store)
        .args(["count", "--state", "RUNNING"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid state: RUNNING"));
}

#[tokio::test]
async fn test_broken_print_count() {
    let store = seeded_store().await;
    for id in ["err-1", "err-2"] {
        store.insert_error(id, "java.lang.IllegalStateException", hours_ago(1)).await;
    }

    cpt_cmd(&store)
        .args(["broken", "--print-count"])
        .assert()
        .success()
        .stdout("2\n");

    cpt_cmd(&store)
        .args(["broken", "--exception-pattern", "it's"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid exception-pattern"));
}

#[tokio::test]
async fn test_broken_piped_into_delete() {
    let store = seeded_store().await;
    for id in ["err-1", "err-3"] {
        store.insert_error(id, "java.util.concurrent.TimeoutException", hours_ago(1)).await;
        store.insert_dependents(id, 1).await;
    }
    store.insert_error("err-2", "java.lang.NullPointerException", hours_ago(1)).await;

    let output = cpt_cmd(&store)
        .args(["broken", "--exception-pattern", "Timeout"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let mut printed: Vec<String> = String::from_utf8(output.clone())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    printed.sort();
    assert_eq!(printed, vec!["err-1", "err-3"]);

    cpt_cmd(&store)
        .arg("delete")
        .write_stdin(output)
        .assert()
        .success();

    assert_eq!(store.rows_referencing("err-1").await, 0);
    assert_eq!(store.rows_referencing("err-3").await, 0);
    assert_eq!(store.count_for("cop_workflow_instance", "id", "err-2").await, 1);
    assert_eq!(store.count_all("cop_workflow_instance").await, 3);
}

#[tokio::test]
async fn test_delete_exits_zero_when_a_dependent_step_fails() {
    let store = seeded_store().await;
    store.insert_error("err-1", "boom", hours_ago(1)).await;
    store.exec(Statement::new("DROP TABLE cop_wait")).await;

    cpt_cmd(&store)
        .args(["delete", "err-1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Error deleting workflow instance from COP_WAIT id=err-1"));

    assert_eq!(store.count_for("cop_workflow_instance", "id", "err-1").await, 0);
}

#[tokio::test]
async fn test_restart_explicit_ids() {
    let store = seeded_store().await;
    store.insert_error("err-1", "boom", hours_ago(1)).await;

    cpt_cmd(&store)
        .args(["restart", "err-1", "wait-1"])
        .assert()
        .success();

    assert_eq!(store.state_of("err-1").await, 0);
    assert_eq!(store.state_of("wait-1").await, 2);
    assert_eq!(store.count_all("cop_queue").await, 1);
}

#[tokio::test]
async fn test_show_flag_validation() {
    let store = seeded_store().await;

    cpt_cmd(&store)
        .args(["show", "err-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Use at least one of the following flags"));

    cpt_cmd(&store)
        .args(["show", "--audit-trail", "--print-data-array", "err-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--print-data-array"));

    cpt_cmd(&store)
        .args(["show", "--instance-details", "err-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id:err-1, state:ERROR"));
}

#[tokio::test]
async fn test_cleanup_by_age() {
    let store = setup_store().await;
    store.insert_instance("old", WorkflowState::Finished, 48, None).await;
    store.insert_instance("new", WorkflowState::Finished, 1, None).await;

    cpt_cmd(&store)
        .args(["cleanup", "--age=24h", "--workflow-instance"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("deleted data older than "));

    assert_eq!(store.count_for("cop_workflow_instance", "id", "old").await, 0);
    assert_eq!(store.count_for("cop_workflow_instance", "id", "new").await, 1);

    cpt_cmd(&store)
        .args(["cleanup", "--age=0d", "--audit-trail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid age value 0d"));

    cpt_cmd(&store)
        .args(["cleanup", "--age=24h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--workflow-instance"));
}

#[tokio::test]
async fn test_cleanup_cutoff_follows_local_clock() {
    let store = setup_store().await;
    // Wall clock of a host five hours west of UTC, no daylight saving
    let local_now = Utc::now().naive_utc() - Duration::hours(5);
    store
        .insert_instance_at("recent", WorkflowState::Finished, local_now - Duration::hours(21), None)
        .await;
    store
        .insert_instance_at("stale", WorkflowState::Finished, local_now - Duration::hours(27), None)
        .await;

    cpt_cmd(&store)
        .env("TZ", "EST5")
        .args(["cleanup", "--age=24h", "--workflow-instance"])
        .assert()
        .success();

    assert_eq!(store.count_for("cop_workflow_instance", "id", "recent").await, 1);
    assert_eq!(store.count_for("cop_workflow_instance", "id", "stale").await, 0);
}

#[test]
fn test_missing_database_url_is_fatal() {
    Command::new(env!("CARGO_BIN_EXE_cpt"))
        .env("RUST_LOG", "error")
        .env("HOME", std::env::temp_dir())
        .env_remove("DATABASE_URL")
        .env_remove("CPT_CONFIG")
        .arg("count")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}
