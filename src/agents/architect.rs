//! Design phase: turn a project brief into a detailed component graph.

use crate::agents::{PhaseAgent, ScopedContext, log, new_agent_id, prompts, record_complete};
use crate::executor::{InvokeRequest, ModelInvoker};
use crate::extract;
use crate::models::draft::{ArchitectureDraft, ComponentDraft, MetricDraft};
use crate::models::{Component, Dept, Edge, LogLevel, PipelinePhase, Project};
use crate::normalize;
use crate::storage::Storage;
use crate::Result;

/// Drives the Design phase.
pub struct Architect<'a, I: ModelInvoker> {
    agent_id: String,
    invoker: &'a I,
    storage: &'a Storage,
}

impl<I: ModelInvoker> PhaseAgent for Architect<'_, I> {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn display_name(&self) -> &'static str {
        "Architect"
    }

    fn dept(&self) -> Dept {
        Dept::Des
    }

    fn initials(&self) -> &'static str {
        "AR"
    }

    fn scoped_context(&self) -> ScopedContext {
        ScopedContext {
            role: "architect",
            access: vec!["project_brief", "existing_graph"],
            restrictions: vec!["no_execution", "no_other_agents_state"],
        }
    }
}

impl<'a, I: ModelInvoker> Architect<'a, I> {
    pub fn new(invoker: &'a I, storage: &'a Storage) -> Self {
        Self {
            agent_id: new_agent_id("architect"),
            invoker,
            storage,
        }
    }

    /// Design (or redesign) the architecture for a project.
    ///
    /// The stored graph is fully replaced; previously persisted ids are
    /// never reused because normalization mints fresh ones.
    pub fn execute(&self, project_id: &str) -> Result<(Vec<Component>, Vec<Edge>)> {
        log(
            self.storage,
            &self.agent_id,
            Some(project_id),
            "start",
            &format!("Designing architecture for project {}", project_id),
            LogLevel::Info,
        );

        let mut project = self.storage.get_project(project_id)?;
        let existing_components = self.storage.list_components(project_id)?;
        let existing_edges = self.storage.list_edges(project_id)?;

        let prompt = build_context(&project, &existing_components, &existing_edges);
        let request = InvokeRequest::new(prompt)
            .with_system(prompts::ARCHITECT_SYSTEM)
            .expect_json();

        let raw = match self.invoker.invoke(&request) {
            Ok(raw) => Some(raw),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(_) => None,
        };
        let draft = raw
            .and_then(|raw| extract::extract(&raw).ok())
            .and_then(|value| serde_json::from_value::<ArchitectureDraft>(value).ok())
            .unwrap_or_else(|| {
                log(
                    self.storage,
                    &self.agent_id,
                    Some(project_id),
                    "error",
                    "Design response unusable; using fallback architecture",
                    LogLevel::Warn,
                );
                fallback_architecture(&project)
            });

        let summary = project.summary.clone().unwrap_or_default();
        let (components, edges) =
            normalize::normalize(draft.components, draft.edges, &project.name, &summary);

        // Full replacement of the persisted graph.
        self.storage.delete_components(project_id)?;
        self.storage.delete_edges(project_id)?;
        for comp in &components {
            self.storage.create_component(project_id, comp)?;
        }
        for edge in &edges {
            self.storage.create_edge(project_id, edge)?;
        }

        project.phase = PipelinePhase::Design;
        self.storage.update_project(&project)?;
        self.storage.mark_global_task_done(project_id, "Phase 2")?;
        record_complete(self.storage, self);

        log(
            self.storage,
            &self.agent_id,
            Some(project_id),
            "complete",
            &format!("Generated {} components", components.len()),
            LogLevel::Info,
        );

        Ok((components, edges))
    }
}

/// Build the design prompt from the brief and any existing graph.
fn build_context(project: &Project, components: &[Component], edges: &[Edge]) -> String {
    let mut component_lines = String::new();
    for comp in components.iter().filter(|c| !c.is_root()) {
        component_lines.push_str(&format!(
            "- {}: {}\n",
            comp.label,
            if comp.summary.is_empty() {
                "No description"
            } else {
                &comp.summary
            }
        ));
        if !comp.inputs.is_empty() {
            component_lines.push_str(&format!("  Inputs: {}\n", comp.inputs.join(", ")));
        }
        if !comp.outputs.is_empty() {
            component_lines.push_str(&format!("  Outputs: {}\n", comp.outputs.join(", ")));
        }
        if !comp.requirements.is_empty() {
            let shown: Vec<_> = comp.requirements.iter().take(3).cloned().collect();
            component_lines.push_str(&format!("  Requirements: {}\n", shown.join(", ")));
        }
    }

    let mut edge_lines = String::new();
    for edge in edges {
        edge_lines.push_str(&format!(
            "- {} -> {} ({}): {}\n",
            edge.from_id, edge.to_id, edge.kind, edge.label
        ));
    }

    prompts::ARCHITECT_DESIGN
        .replace("{title}", &project.name)
        .replace("{summary}", project.summary.as_deref().unwrap_or("Not specified"))
        .replace("{problem}", project.problem.as_deref().unwrap_or("Not specified"))
        .replace("{phase}", &project.phase.to_string())
        .replace(
            "{component_count}",
            &components.iter().filter(|c| !c.is_root()).count().to_string(),
        )
        .replace("{components}", &component_lines)
        .replace("{edge_count}", &edges.len().to_string())
        .replace("{edges}", &edge_lines)
}

/// Deterministic minimal architecture used when the model response is
/// unusable. Normalization adds the root and layout on top.
fn fallback_architecture(project: &Project) -> ArchitectureDraft {
    ArchitectureDraft {
        components: vec![ComponentDraft {
            id: Some("comp_core".to_string()),
            label: Some("Core System".to_string()),
            summary: Some("Main system functionality".to_string()),
            problem: Some(format!("Implements the goals of {}", project.name)),
            goals: vec!["Complete core functionality".to_string()],
            inputs: vec!["User Input".to_string()],
            outputs: vec!["System Output".to_string()],
            requirements: vec!["Must function as specified".to_string()],
            risks: vec!["Architecture may need refinement".to_string()],
            metrics: vec![MetricDraft {
                requirement: Some("Functional completeness".to_string()),
                value: Some("TBD".to_string()),
                status: None,
                weight: Some(2.0),
            }],
            test_cases: serde_json::from_str(r#"["Core functionality test"]"#).unwrap_or_default(),
            ..Default::default()
        }],
        edges: Vec::new(),
        architecture_notes: Some(
            "Fallback architecture - manual refinement recommended".to_string(),
        ),
    }
}
