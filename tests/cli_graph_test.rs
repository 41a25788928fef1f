//! Integration tests for graph export, throttle status, and logs via the CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use foreman::models::{
    AgentRecord, AgentStatus, Component, ComponentType, Dept, Edge, EdgeKind, GlobalTask,
    LogEntry, LogLevel, Project,
};
use foreman::storage::Storage;

fn fm_in(workspace: &TempDir, data: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fm"));
    cmd.current_dir(workspace.path());
    cmd.env("FM_DATA_DIR", data.path());
    cmd
}

fn init_foreman() -> (TempDir, TempDir) {
    let workspace = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    fm_in(&workspace, &data)
        .args(["system", "init"])
        .assert()
        .success();
    (workspace, data)
}

fn seed_full_graph(workspace: &TempDir, data: &TempDir) {
    let storage = Storage::open_with_data_dir(workspace.path(), data.path()).unwrap();

    let mut project = Project::new("fp-ab12".to_string(), "Dashboard".to_string());
    project.summary = Some("A metrics dashboard".to_string());
    storage.create_project(&project).unwrap();

    let mut root = Component::new("fc-root0001".to_string(), "Dashboard".to_string());
    root.kind = ComponentType::Root;
    storage.create_component("fp-ab12", &root).unwrap();
    storage
        .create_component(
            "fp-ab12",
            &Component::new("fc-api00001".to_string(), "API Layer".to_string()),
        )
        .unwrap();
    storage
        .create_edge(
            "fp-ab12",
            &Edge::new(
                "fc-root0001".to_string(),
                "fc-api00001".to_string(),
                "Contains".to_string(),
                EdgeKind::Data,
            ),
        )
        .unwrap();

    storage
        .create_agent(&AgentRecord {
            id: "architect_12345678".to_string(),
            name: "Architect".to_string(),
            dept: Dept::Des,
            initials: "AR".to_string(),
            status: AgentStatus::Complete,
        })
        .unwrap();

    storage
        .create_global_task(
            "fp-ab12",
            &GlobalTask {
                text: "Phase 1: Interview - Gather requirements".to_string(),
                done: true,
                sort_order: 0,
            },
        )
        .unwrap();

    storage
        .create_log(&LogEntry {
            project_id: Some("fp-ab12".to_string()),
            component_id: None,
            agent_id: Some("architect_12345678".to_string()),
            action: "complete".to_string(),
            message: "Generated 2 components".to_string(),
            level: LogLevel::Info,
            timestamp: chrono::Utc::now(),
        })
        .unwrap();
}

#[test]
fn test_graph_export_document_shape() {
    let (workspace, data) = init_foreman();
    seed_full_graph(&workspace, &data);

    let output = fm_in(&workspace, &data)
        .args(["graph", "export", "fp-ab12"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(doc["projectName"], "Dashboard");
    assert_eq!(doc["projectSummary"], "A metrics dashboard");
    assert_eq!(doc["phase"], "interview");
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(doc["edges"].as_array().unwrap().len(), 1);
    assert_eq!(doc["edges"][0]["from"], "fc-root0001");
    assert_eq!(doc["globalTasks"][0]["done"], true);
    assert_eq!(doc["agents"][0]["dept"], "DES");
    assert_eq!(doc["agents"][0]["initials"], "AR");
}

#[test]
fn test_graph_export_human() {
    let (workspace, data) = init_foreman();
    seed_full_graph(&workspace, &data);

    fm_in(&workspace, &data)
        .args(["graph", "export", "fp-ab12", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 nodes, 1 edges"));
}

#[test]
fn test_graph_export_missing_project() {
    let (workspace, data) = init_foreman();

    fm_in(&workspace, &data)
        .args(["graph", "export", "fp-none"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Entity not found"));
}

#[test]
fn test_throttle_status_defaults() {
    let (workspace, data) = init_foreman();

    let output = fm_in(&workspace, &data)
        .args(["throttle", "status"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["minute_limit"], 50);
    assert_eq!(status["hour_limit"], 1000);
    assert_eq!(status["minute_calls"], 0);
    assert_eq!(status["can_call"], true);
}

#[test]
fn test_throttle_status_respects_config() {
    let (workspace, data) = init_foreman();

    // Write a config.kdl into the workspace's data dir.
    let storage = Storage::open_with_data_dir(workspace.path(), data.path()).unwrap();
    std::fs::write(
        storage.root.join("config.kdl"),
        "calls-per-minute 5\ncalls-per-hour 20\n",
    )
    .unwrap();

    fm_in(&workspace, &data)
        .args(["throttle", "status", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0/5 used"))
        .stdout(predicate::str::contains("0/20 used"));
}

#[test]
fn test_log_lists_entries() {
    let (workspace, data) = init_foreman();
    seed_full_graph(&workspace, &data);

    fm_in(&workspace, &data)
        .args(["log", "fp-ab12", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete: Generated 2 components"));
}

#[test]
fn test_action_log_written() {
    let (workspace, data) = init_foreman();

    fm_in(&workspace, &data)
        .args(["project", "list"])
        .assert()
        .success();

    let storage = Storage::open_with_data_dir(workspace.path(), data.path()).unwrap();
    let log_path = storage.root.join("action.log");
    assert!(log_path.exists());
    let text = std::fs::read_to_string(&log_path).unwrap();
    assert!(text.contains("\"command\":\"project list\""));
    assert!(text.contains("\"success\":true"));
}
