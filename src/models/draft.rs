//! Lenient decode targets for model output.
//!
//! The external service returns JSON of roughly the right shape, with
//! fields missing, ids it invented, and test cases given as bare
//! strings. These types accept all of that at the boundary; everything
//! downstream of normalization works with the strict types in
//! `models::mod` instead of untyped maps.

use serde::Deserialize;

use crate::models::plan::{PlanFile, PlanInterfaces};

/// A test case as the model may emit it: a bare name or a full record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TestCaseDraft {
    Name(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        priority: Option<String>,
    },
}

impl TestCaseDraft {
    /// Lift to a plain test name, defaulting an empty record.
    pub fn name(&self) -> String {
        match self {
            TestCaseDraft::Name(s) => s.clone(),
            TestCaseDraft::Full { name, .. } => {
                if name.is_empty() {
                    "Unnamed test".to_string()
                } else {
                    name.clone()
                }
            }
        }
    }
}

/// A metric as the model may emit it.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricDraft {
    #[serde(rename = "req", alias = "requirement", default)]
    pub requirement: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub weight: Option<f64>,
}

/// A candidate component, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentDraft {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub problem: Option<String>,

    #[serde(default)]
    pub goals: Vec<String>,

    #[serde(default)]
    pub scope: Vec<String>,

    #[serde(default)]
    pub requirements: Vec<String>,

    #[serde(default)]
    pub risks: Vec<String>,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default)]
    pub metrics: Vec<MetricDraft>,

    #[serde(rename = "testCases", alias = "test_cases", default)]
    pub test_cases: Vec<TestCaseDraft>,
}

/// A candidate edge. `from`/`to` may reference the model's own
/// invented component ids; normalization rewrites or drops them.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeDraft {
    #[serde(alias = "from_id", default)]
    pub from: Option<String>,

    #[serde(alias = "to_id", default)]
    pub to: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// The structured brief produced by the Interview phase.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BriefDraft {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub problem: Option<String>,

    #[serde(default)]
    pub goals: Vec<String>,

    #[serde(default)]
    pub components: Vec<ComponentDraft>,

    #[serde(default)]
    pub edges: Vec<EdgeDraft>,

    #[serde(default)]
    pub global_requirements: Vec<String>,

    #[serde(default)]
    pub global_risks: Vec<String>,

    #[serde(default)]
    pub questions: Vec<String>,
}

/// The architecture produced by the Design phase.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchitectureDraft {
    #[serde(default)]
    pub components: Vec<ComponentDraft>,

    #[serde(default)]
    pub edges: Vec<EdgeDraft>,

    #[serde(default)]
    pub architecture_notes: Option<String>,
}

/// A step as the model may emit it: a bare description or a record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepDraft {
    Text(String),
    Full {
        #[serde(default)]
        description: String,
        #[serde(default)]
        order: Option<usize>,
    },
}

impl StepDraft {
    pub fn description(&self) -> String {
        match self {
            StepDraft::Text(s) => s.clone(),
            StepDraft::Full { description, .. } => description.clone(),
        }
    }
}

/// A planned test as the model may emit it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanTestDraft {
    Name(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(rename = "type", default)]
        kind: Option<String>,
    },
}

/// A per-component build plan as returned by the model.
///
/// `component_id`/`component_label` are absent on first generation
/// (the scheduler attaches them) but present on plans echoed back by
/// the consistency pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanDraft {
    #[serde(default)]
    pub component_id: Option<String>,

    #[serde(default)]
    pub component_label: Option<String>,

    #[serde(default)]
    pub files: Vec<PlanFile>,

    #[serde(default)]
    pub steps: Vec<StepDraft>,

    #[serde(default)]
    pub interfaces: Option<PlanInterfaces>,

    #[serde(default)]
    pub tests: Vec<PlanTestDraft>,
}

/// The consistency pass response: possibly revised plans plus issues.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationDraft {
    #[serde(default)]
    pub validated_plans: Option<Vec<PlanDraft>>,

    #[serde(default)]
    pub issues: Vec<String>,

    #[serde(default)]
    pub suggestions: Vec<String>,
}
