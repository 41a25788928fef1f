//! Data models for Foreman entities.
//!
//! This module defines the core data structures:
//! - `Component` - A buildable unit of work in the project graph
//! - `Edge` - Directed, labeled dependency between two components
//! - `Metric` / `TestCase` - Per-component acceptance tracking
//! - `Project` - Top-level pipeline state
//! - `AgentRecord`, `Manager`, `GlobalTask`, `LogEntry` - Pipeline bookkeeping

pub mod draft;
pub mod graph;
pub mod plan;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Component kind: exactly one root per project, everything else a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Root,
    #[default]
    Node,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::Root => write!(f, "root"),
            ComponentType::Node => write!(f, "node"),
        }
    }
}

impl std::str::FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "root" => Ok(ComponentType::Root),
            "node" => Ok(ComponentType::Node),
            _ => Err(format!("Unknown component type: {}", s)),
        }
    }
}

/// Component lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    #[default]
    Pending,
    Active,
    Complete,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Pending => write!(f, "pending"),
            ComponentStatus::Active => write!(f, "active"),
            ComponentStatus::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for ComponentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ComponentStatus::Pending),
            "active" => Ok(ComponentStatus::Active),
            "complete" => Ok(ComponentStatus::Complete),
            _ => Err(format!("Unknown component status: {}", s)),
        }
    }
}

/// Pass/fail state for metrics and test cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Pending,
    Pass,
    Fail,
}

/// A requirement metric attached to a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    /// Requirement text (e.g., "p99 latency under 100ms")
    #[serde(rename = "req")]
    pub requirement: String,

    /// Measured or target value
    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub status: CheckStatus,

    /// Weight for scoring (default 1.0)
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// A test case attached to a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,

    #[serde(default)]
    pub status: CheckStatus,

    #[serde(default)]
    pub value: String,

    /// Weight for scoring (default 1.0)
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Metric {
    /// Create a pending metric with unit weight.
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            value: String::new(),
            status: CheckStatus::Pending,
            weight: 1.0,
        }
    }
}

impl TestCase {
    /// Create a pending test case with unit weight.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pending,
            value: String::new(),
            weight: 1.0,
        }
    }
}

/// One unit of planned work attached to a component by the Plan phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subtask {
    /// A file to create
    File {
        path: String,
        purpose: String,
        #[serde(default)]
        status: CheckStatus,
        #[serde(default)]
        dependencies: Vec<String>,
    },
    /// An ordered implementation step
    Step {
        order: usize,
        description: String,
        #[serde(default)]
        status: CheckStatus,
    },
    /// A test to write
    Test {
        name: String,
        #[serde(default)]
        status: CheckStatus,
    },
}

/// A node in the project's dependency graph representing one buildable
/// unit of work.
///
/// Serialized field names follow the graph interchange format consumed
/// by the visualization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    /// Unique identifier (e.g., "fc-a1b2c3d4"), unique within a project
    pub id: String,

    pub label: String,

    #[serde(rename = "type", default)]
    pub kind: ComponentType,

    #[serde(default)]
    pub status: ComponentStatus,

    /// Layout position assigned by normalization
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub problem: String,

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
    pub subtasks: Vec<Subtask>,

    #[serde(default)]
    pub metrics: Vec<Metric>,

    #[serde(rename = "testCases", default)]
    pub test_cases: Vec<TestCase>,

    /// Agent currently assigned to this component
    #[serde(rename = "agentId", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(rename = "lastEdited", skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<DateTime<Utc>>,
}

impl Component {
    /// Create a new node component with the given ID and label.
    ///
    /// All list fields start empty and status starts pending, so
    /// downstream consumers never need to null-check.
    pub fn new(id: String, label: String) -> Self {
        Self {
            id,
            label,
            kind: ComponentType::Node,
            status: ComponentStatus::Pending,
            x: 0,
            y: 0,
            summary: String::new(),
            problem: String::new(),
            goals: Vec::new(),
            scope: Vec::new(),
            requirements: Vec::new(),
            risks: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            files: Vec::new(),
            subtasks: Vec::new(),
            metrics: Vec::new(),
            test_cases: Vec::new(),
            agent_id: None,
            last_edited: None,
        }
    }

    /// Returns true if this is the project root.
    pub fn is_root(&self) -> bool {
        self.kind == ComponentType::Root
    }
}

/// Kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Data flows from source to target
    #[default]
    Data,
    /// Target consumes an API exposed by source
    Api,
    /// Authentication/authorization dependency
    Auth,
    /// Shared schema dependency
    Schema,
    /// Logging/telemetry dependency
    Log,
}

impl EdgeKind {
    /// Get all edge kinds.
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::Data,
            EdgeKind::Api,
            EdgeKind::Auth,
            EdgeKind::Schema,
            EdgeKind::Log,
        ]
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeKind::Data => "data",
            EdgeKind::Api => "api",
            EdgeKind::Auth => "auth",
            EdgeKind::Schema => "schema",
            EdgeKind::Log => "log",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "data" => Ok(EdgeKind::Data),
            "api" => Ok(EdgeKind::Api),
            "auth" => Ok(EdgeKind::Auth),
            "schema" => Ok(EdgeKind::Schema),
            "log" => Ok(EdgeKind::Log),
            _ => Err(format!("Unknown edge kind: {}", s)),
        }
    }
}

/// A directed, labeled relationship between two components.
///
/// An edge `A -> B` means B depends on A for scheduling purposes:
/// A is a predecessor of B in the build order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "from")]
    pub from_id: String,

    #[serde(rename = "to")]
    pub to_id: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
}

impl Edge {
    /// Create a new edge between two component IDs.
    pub fn new(from_id: String, to_id: String, label: String, kind: EdgeKind) -> Self {
        Self {
            from_id,
            to_id,
            label,
            kind,
        }
    }
}

/// Pipeline phase a project is currently in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    #[default]
    Interview,
    Design,
    Planning,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelinePhase::Interview => write!(f, "interview"),
            PipelinePhase::Design => write!(f, "design"),
            PipelinePhase::Planning => write!(f, "planning"),
        }
    }
}

impl std::str::FromStr for PipelinePhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "interview" => Ok(PipelinePhase::Interview),
            "design" => Ok(PipelinePhase::Design),
            "planning" => Ok(PipelinePhase::Planning),
            _ => Err(format!("Unknown pipeline phase: {}", s)),
        }
    }
}

/// A project tracked by Foreman.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (e.g., "fp-a1b2")
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub phase: PipelinePhase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,

    /// Accumulated interview transcript
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Serialized work plan produced by the Plan phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_plan: Option<String>,

    /// Open clarifying questions from the Interview phase
    #[serde(default)]
    pub questions: Vec<String>,

    /// How many interview refinement rounds have run
    #[serde(default)]
    pub refinement_iteration: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project in the interview phase.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            phase: PipelinePhase::Interview,
            summary: None,
            problem: None,
            transcript: None,
            work_plan: None,
            questions: Vec::new(),
            refinement_iteration: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Department a pipeline agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dept {
    /// Discovery (interview)
    #[serde(rename = "DISC")]
    Disc,
    /// Design (architecture)
    #[serde(rename = "DES")]
    Des,
    /// Management (planning)
    #[serde(rename = "MGT")]
    Mgt,
    /// Development (execution)
    #[serde(rename = "DEV")]
    Dev,
}

impl fmt::Display for Dept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dept::Disc => "DISC",
            Dept::Des => "DES",
            Dept::Mgt => "MGT",
            Dept::Dev => "DEV",
        };
        write!(f, "{}", s)
    }
}

/// Agent run status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Pending,
    Active,
    Working,
    Complete,
}

/// A record of one pipeline agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Unique identifier (e.g., "interviewer_a1b2c3d4")
    pub id: String,

    pub name: String,

    pub dept: Dept,

    pub initials: String,

    #[serde(default)]
    pub status: AgentStatus,
}

/// A manager responsible for one component during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manager {
    pub id: String,
    pub project_id: String,
    pub component_id: String,

    #[serde(default)]
    pub status: ComponentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A project-level phase checklist item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalTask {
    pub text: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub sort_order: i64,
}

/// Log severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// A structured log entry written by agents and commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// The action being logged (e.g., "cli_call", "rate_limit")
    pub action: String,

    pub message: String,

    #[serde(default)]
    pub level: LogLevel,

    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_serialization_roundtrip() {
        let comp = Component::new("fc-test0001".to_string(), "Scraper Engine".to_string());
        let json = serde_json::to_string(&comp).unwrap();
        let deserialized: Component = serde_json::from_str(&json).unwrap();
        assert_eq!(comp.id, deserialized.id);
        assert_eq!(comp.label, deserialized.label);
        assert_eq!(deserialized.kind, ComponentType::Node);
        assert_eq!(deserialized.status, ComponentStatus::Pending);
    }

    #[test]
    fn test_component_graph_field_names() {
        let mut comp = Component::new("fc-x".to_string(), "X".to_string());
        comp.test_cases.push(TestCase::new("smoke"));
        comp.agent_id = Some("A1".to_string());
        let json = serde_json::to_string(&comp).unwrap();
        assert!(json.contains("\"testCases\""));
        assert!(json.contains("\"agentId\""));
        assert!(json.contains("\"type\":\"node\""));
    }

    #[test]
    fn test_component_defaults_from_sparse_json() {
        // The shape a model is most likely to return: id, label, little else.
        let json = r#"{"id":"c1","label":"API Layer"}"#;
        let comp: Component = serde_json::from_str(json).unwrap();
        assert_eq!(comp.kind, ComponentType::Node);
        assert_eq!(comp.status, ComponentStatus::Pending);
        assert!(comp.goals.is_empty());
        assert!(comp.metrics.is_empty());
        assert!(comp.test_cases.is_empty());
        assert_eq!(comp.agent_id, None);
    }

    #[test]
    fn test_edge_serialization_uses_from_to() {
        let edge = Edge::new(
            "fc-a".to_string(),
            "fc-b".to_string(),
            "Feeds".to_string(),
            EdgeKind::Data,
        );
        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains("\"from\":\"fc-a\""));
        assert!(json.contains("\"to\":\"fc-b\""));
        assert!(json.contains("\"type\":\"data\""));
    }

    #[test]
    fn test_edge_kind_from_str() {
        assert_eq!("data".parse::<EdgeKind>().unwrap(), EdgeKind::Data);
        assert_eq!("api".parse::<EdgeKind>().unwrap(), EdgeKind::Api);
        assert_eq!("auth".parse::<EdgeKind>().unwrap(), EdgeKind::Auth);
        assert_eq!("schema".parse::<EdgeKind>().unwrap(), EdgeKind::Schema);
        assert_eq!("log".parse::<EdgeKind>().unwrap(), EdgeKind::Log);
        assert!("invalid".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn test_edge_kind_display() {
        assert_eq!(EdgeKind::Data.to_string(), "data");
        assert_eq!(EdgeKind::Schema.to_string(), "schema");
    }

    #[test]
    fn test_edge_kind_all() {
        assert_eq!(EdgeKind::all().len(), 5);
        assert!(EdgeKind::all().contains(&EdgeKind::Auth));
    }

    #[test]
    fn test_metric_default_weight() {
        let json = r#"{"req":"Unit tests pass"}"#;
        let metric: Metric = serde_json::from_str(json).unwrap();
        assert_eq!(metric.weight, 1.0);
        assert_eq!(metric.status, CheckStatus::Pending);
        assert_eq!(metric.value, "");
    }

    #[test]
    fn test_test_case_default_weight() {
        let json = r#"{"name":"roundtrip"}"#;
        let tc: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(tc.weight, 1.0);
        assert_eq!(tc.status, CheckStatus::Pending);
    }

    #[test]
    fn test_subtask_tagged_serialization() {
        let sub = Subtask::Step {
            order: 2,
            description: "Implement core logic".to_string(),
            status: CheckStatus::Pending,
        };
        let json = serde_json::to_string(&sub).unwrap();
        assert!(json.contains("\"type\":\"step\""));

        let file: Subtask =
            serde_json::from_str(r#"{"type":"file","path":"src/api.rs","purpose":"API"}"#).unwrap();
        match file {
            Subtask::File { path, .. } => assert_eq!(path, "src/api.rs"),
            _ => panic!("expected file subtask"),
        }
    }

    #[test]
    fn test_pipeline_phase_roundtrip() {
        assert_eq!(
            "interview".parse::<PipelinePhase>().unwrap(),
            PipelinePhase::Interview
        );
        assert_eq!(
            "design".parse::<PipelinePhase>().unwrap(),
            PipelinePhase::Design
        );
        assert_eq!(
            "planning".parse::<PipelinePhase>().unwrap(),
            PipelinePhase::Planning
        );
        assert!("execute".parse::<PipelinePhase>().is_err());
        assert_eq!(PipelinePhase::Design.to_string(), "design");
    }

    #[test]
    fn test_project_serialization_roundtrip() {
        let project = Project::new("fp-ab12".to_string(), "News Scraper".to_string());
        let json = serde_json::to_string(&project).unwrap();
        let deserialized: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(project.id, deserialized.id);
        assert_eq!(deserialized.phase, PipelinePhase::Interview);
        assert!(deserialized.questions.is_empty());
    }

    #[test]
    fn test_dept_serialization() {
        let json = serde_json::to_string(&Dept::Disc).unwrap();
        assert_eq!(json, r#""DISC""#);
        let json = serde_json::to_string(&Dept::Mgt).unwrap();
        assert_eq!(json, r#""MGT""#);
    }

    #[test]
    fn test_agent_status_default() {
        let json = r#"{"id":"a1","name":"Interviewer","dept":"DISC","initials":"IN"}"#;
        let agent: AgentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
    }
}
