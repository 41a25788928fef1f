//! End-to-end pipeline test against a stub model CLI.
//!
//! A shell script stands in for the external executable and answers
//! each phase's prompt with canned JSON, so the full chain (executor,
//! extractor, normalizer, scheduler, storage) runs exactly as it
//! would against the real service.

#![cfg(unix)]

use assert_cmd::Command;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

const STUB_SCRIPT: &str = r#"#!/bin/sh
# $1 = -p, $2 = prompt, $3 = --dangerously-skip-permissions
prompt="$2"
case "$prompt" in
*"Review these build plans"*)
cat <<'JSON'
{"validated_plans": null, "issues": ["Parser output format is unspecified"]}
JSON
;;
*"Analyze this component and create a detailed build plan"*)
cat <<'JSON'
{
  "files": [{"path": "src/component/main.py", "purpose": "Implementation"}],
  "steps": ["Design the interface", "Implement", "Test"],
  "tests": [{"name": "test_component", "type": "unit"}]
}
JSON
;;
*"create a detailed system architecture"*)
cat <<'JSON'
```json
{
  "components": [
    {"id": "fetch", "label": "Fetcher", "summary": "Downloads pages"},
    {"id": "parse", "label": "Parser", "summary": "Extracts articles"},
    {"id": "store", "label": "Writer", "summary": "Writes CSV"}
  ],
  "edges": [
    {"from": "fetch", "to": "parse", "label": "Raw HTML", "type": "data"},
    {"from": "parse", "to": "store", "label": "Articles", "type": "data"}
  ]
}
```
JSON
;;
*"Analyze this project description"*)
cat <<'JSON'
Sure! Here is the brief:
{
  "title": "News Scraper",
  "summary": "Scrapes news sites into CSV",
  "problem": "Manual collection is slow",
  "goals": ["Collect articles nightly"],
  "components": [
    {"id": "c1", "label": "Fetcher"},
    {"id": "c2", "label": "Parser"}
  ],
  "edges": [{"from": "c1", "to": "c2", "label": "Raw HTML", "type": "data"}],
  "questions": []
}
JSON
;;
*)
echo '{}'
;;
esac
"#;

struct PipelineEnv {
    workspace: TempDir,
    data: TempDir,
    stub: TempDir,
}

impl PipelineEnv {
    fn new() -> Self {
        let env = Self {
            workspace: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
            stub: TempDir::new().unwrap(),
        };
        let stub_path = env.stub.path().join("model-cli");
        std::fs::write(&stub_path, STUB_SCRIPT).unwrap();
        std::fs::set_permissions(&stub_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        env.fm().args(["system", "init"]).assert().success();
        env
    }

    fn fm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fm"));
        cmd.current_dir(self.workspace.path());
        cmd.env("FM_DATA_DIR", self.data.path());
        cmd.env("FM_CLI_BIN", self.stub.path().join("model-cli"));
        cmd
    }

    fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.fm().args(args).assert().success();
        let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
        serde_json::from_str(&stdout).unwrap()
    }
}

#[test]
fn test_interview_creates_normalized_project() {
    let env = PipelineEnv::new();

    let brief = env.run_json(&["interview", "build a news scraper"]);

    assert_eq!(brief["title"], "News Scraper");
    let project_id = brief["project_id"].as_str().unwrap();
    assert!(project_id.starts_with("fp-"));

    // Two drafted components plus the synthesized root, all re-minted.
    let components = brief["components"].as_array().unwrap();
    assert_eq!(components.len(), 3);
    assert!(
        components
            .iter()
            .all(|c| c["id"].as_str().unwrap().starts_with("fc-"))
    );
    let root_count = components
        .iter()
        .filter(|c| c["type"] == "root")
        .count();
    assert_eq!(root_count, 1);

    // The first analysis always leaves clarifying questions open.
    assert!(!brief["questions"].as_array().unwrap().is_empty());
}

#[test]
fn test_full_pipeline_interview_design_plan() {
    let env = PipelineEnv::new();

    let brief = env.run_json(&["interview", "build a news scraper"]);
    let project_id = brief["project_id"].as_str().unwrap().to_string();

    // Design replaces the interview graph with the architecture.
    let design = env.run_json(&["design", &project_id]);
    let components = design["components"].as_array().unwrap();
    // Fetcher, Parser, Writer plus the synthesized root.
    assert_eq!(components.len(), 4);

    let project = env.run_json(&["project", "show", &project_id]);
    assert_eq!(project["phase"], "design");

    // Plan produces the dependency-ordered work plan.
    let work_plan = env.run_json(&["plan", &project_id]);
    assert_eq!(work_plan["total_components"], 3);

    let order: Vec<(String, u64)> = work_plan["execution_order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["label"].as_str().unwrap().to_string(),
                e["phase"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("Fetcher".to_string(), 1),
            ("Parser".to_string(), 2),
            ("Writer".to_string(), 3)
        ]
    );

    // Each plan decoded from the stub, not the fallback.
    let plans = work_plan["component_plans"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["files"][0]["path"], "src/component/main.py");

    // The consistency pass issues were carried through to the logs.
    let project = env.run_json(&["project", "show", &project_id]);
    assert_eq!(project["phase"], "planning");
}

#[test]
fn test_plan_attaches_subtasks_to_components() {
    let env = PipelineEnv::new();

    let brief = env.run_json(&["interview", "build a news scraper"]);
    let project_id = brief["project_id"].as_str().unwrap().to_string();
    env.run_json(&["design", &project_id]);
    env.run_json(&["plan", &project_id]);

    let components = env.run_json(&["component", "list", &project_id]);
    let fetcher = components
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["label"] == "Fetcher")
        .unwrap();
    let subtasks = fetcher["subtasks"].as_array().unwrap();
    // 1 file + 3 steps + 1 test from the stub plan.
    assert_eq!(subtasks.len(), 5);
    assert!(subtasks.iter().any(|s| s["type"] == "file"));
    assert!(subtasks.iter().any(|s| s["type"] == "test"));
}

#[test]
fn test_graph_export_after_design() {
    let env = PipelineEnv::new();

    let brief = env.run_json(&["interview", "build a news scraper"]);
    let project_id = brief["project_id"].as_str().unwrap().to_string();
    env.run_json(&["design", &project_id]);

    let doc = env.run_json(&["graph", "export", &project_id]);
    assert_eq!(doc["projectName"], "News Scraper");
    assert_eq!(doc["phase"], "design");
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 4);
    // Layout was assigned: the root sits at the top row.
    let root = doc["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["type"] == "root")
        .unwrap();
    assert_eq!(root["y"], 50);
    // Both interviewer and architect agents were recorded.
    let agents = doc["agents"].as_array().unwrap();
    assert!(agents.iter().any(|a| a["dept"] == "DISC"));
    assert!(agents.iter().any(|a| a["dept"] == "DES"));
}

#[test]
fn test_missing_executable_is_fatal() {
    let env = PipelineEnv::new();

    // A missing executable is environment misconfiguration: the phase
    // aborts instead of substituting a fallback.
    Command::new(env!("CARGO_BIN_EXE_fm"))
        .current_dir(env.workspace.path())
        .env("FM_DATA_DIR", env.data.path())
        .env("FM_CLI_BIN", "/nonexistent/model-cli")
        .args(["interview", "build something"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("executable not found"));
}

#[test]
fn test_failing_stub_falls_back_to_deterministic_brief() {
    let env = PipelineEnv::new();

    // A stub that always exits non-zero: retries exhaust and the
    // interview substitutes its deterministic fallback brief.
    let failing = env.stub.path().join("failing-cli");
    std::fs::write(&failing, "#!/bin/sh\nexit 1\n").unwrap();
    std::fs::set_permissions(&failing, std::fs::Permissions::from_mode(0o755)).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_fm"))
        .current_dir(env.workspace.path())
        .env("FM_DATA_DIR", env.data.path())
        .env("FM_CLI_BIN", &failing)
        .args(["interview", "build something"])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let brief: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(brief["title"], "New Project");
    assert_eq!(brief["components"].as_array().unwrap().len(), 2);
}
