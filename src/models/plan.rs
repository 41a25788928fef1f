//! Build plan and execution order models produced by the Plan phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file the plan calls for creating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    pub path: String,

    #[serde(default)]
    pub purpose: String,

    /// Paths or component labels this file depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// An ordered implementation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    pub order: usize,
}

/// A test the plan calls for writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTest {
    pub name: String,

    /// Test kind (e.g., "unit", "integration")
    #[serde(rename = "type", default = "default_test_kind")]
    pub kind: String,
}

fn default_test_kind() -> String {
    "unit".to_string()
}

/// Input/output contracts for a component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanInterfaces {
    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,
}

/// A file-by-file build plan for one component.
///
/// Regenerated wholesale on each scheduling run; there is no
/// incremental diffing against a previous plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    pub component_id: String,
    pub component_label: String,

    #[serde(default)]
    pub files: Vec<PlanFile>,

    #[serde(default)]
    pub steps: Vec<PlanStep>,

    #[serde(default)]
    pub interfaces: PlanInterfaces,

    #[serde(default)]
    pub tests: Vec<PlanTest>,
}

/// One entry of the dependency-ordered build schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub component_id: String,
    pub label: String,

    /// Build phase number, starting at 1; all of a component's
    /// predecessors carry strictly smaller phase numbers.
    pub phase: usize,
}

/// The overall work plan stored on the project after the Plan phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkPlan {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub total_components: usize,
    pub execution_order: Vec<PhaseEntry>,
    pub component_plans: Vec<BuildPlan>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_test_default_kind() {
        let test: PlanTest = serde_json::from_str(r#"{"name":"test_parser_basic"}"#).unwrap();
        assert_eq!(test.kind, "unit");
    }

    #[test]
    fn test_build_plan_defaults() {
        let plan: BuildPlan =
            serde_json::from_str(r#"{"component_id":"fc-1","component_label":"Parser"}"#).unwrap();
        assert!(plan.files.is_empty());
        assert!(plan.steps.is_empty());
        assert!(plan.tests.is_empty());
        assert!(plan.interfaces.inputs.is_empty());
    }

    #[test]
    fn test_work_plan_roundtrip() {
        let plan = WorkPlan {
            created_at: Utc::now(),
            created_by: "gm_abcd1234".to_string(),
            total_components: 1,
            execution_order: vec![PhaseEntry {
                component_id: "fc-1".to_string(),
                label: "Parser".to_string(),
                phase: 1,
            }],
            component_plans: vec![BuildPlan {
                component_id: "fc-1".to_string(),
                component_label: "Parser".to_string(),
                files: vec![PlanFile {
                    path: "src/parser.rs".to_string(),
                    purpose: "Main implementation".to_string(),
                    dependencies: vec![],
                }],
                steps: vec![PlanStep {
                    description: "Set up file structure".to_string(),
                    order: 1,
                }],
                interfaces: PlanInterfaces::default(),
                tests: vec![],
            }],
        };
        let json = serde_json::to_string(&plan).unwrap();
        let back: WorkPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.execution_order[0].phase, 1);
        assert_eq!(back.component_plans[0].files[0].path, "src/parser.rs");
    }
}
