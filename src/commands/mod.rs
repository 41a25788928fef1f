//! Command implementations for the Foreman CLI.
//!
//! Each command returns an [`Output`] carrying both the JSON document
//! printed by default and a human-readable rendering for `-H`.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::agents::architect::Architect;
use crate::agents::interviewer::Interviewer;
use crate::agents::planner::Planner;
use crate::config::ForemanConfig;
use crate::executor::CliExecutor;
use crate::models::graph::GraphData;
use crate::models::{ComponentStatus, Edge, EdgeKind};
use crate::storage::{Storage, get_storage_dir};
use crate::throttle::CallThrottle;
use crate::{Error, Result};

/// A command result in both output formats.
#[derive(Debug)]
pub struct Output {
    pub value: serde_json::Value,
    pub human: String,
}

impl Output {
    fn new(value: serde_json::Value, human: impl Into<String>) -> Self {
        Self {
            value,
            human: human.into(),
        }
    }
}

/// Build the CLI-backed executor for a workspace from its config.
fn executor_for(workspace: &Path) -> Result<CliExecutor> {
    let root = get_storage_dir(workspace)?;
    let config = ForemanConfig::load(&root)?;
    let throttle = Arc::new(CallThrottle::new(config.throttle_config()));
    Ok(CliExecutor::new(config.executor_config(), throttle))
}

/// Initialize foreman storage for the workspace.
pub fn system_init(workspace: &Path) -> Result<Output> {
    if Storage::exists(workspace)? {
        return Ok(Output::new(
            json!({"initialized": false, "reason": "already initialized"}),
            "Foreman is already initialized for this workspace",
        ));
    }
    let storage = Storage::init(workspace)?;
    Ok(Output::new(
        json!({"initialized": true, "data_dir": storage.root.to_string_lossy()}),
        format!("Initialized foreman at {}", storage.root.display()),
    ))
}

/// Phase 1: interview.
pub fn interview(workspace: &Path, description: &str, project: Option<&str>) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let executor = executor_for(workspace)?;
    let interviewer = Interviewer::new(&executor, &storage);
    let brief = interviewer.execute(description, project)?;

    let human = format!(
        "Project {} ({}): {} components, {} open questions",
        brief.project_id,
        brief.title,
        brief.components.len(),
        brief.questions.len(),
    );
    Ok(Output::new(serde_json::to_value(&brief)?, human))
}

/// Interview refinement round.
pub fn refine(
    workspace: &Path,
    project_id: &str,
    answers: &[String],
    context: &str,
) -> Result<Output> {
    let parsed: Vec<(String, String)> = answers
        .iter()
        .map(|raw| match raw.split_once('=') {
            Some((q, a)) => Ok((q.trim().to_string(), a.trim().to_string())),
            None => Err(Error::InvalidInput(format!(
                "Answer must be \"question=answer\", got: {}",
                raw
            ))),
        })
        .collect::<Result<_>>()?;

    let storage = Storage::open(workspace)?;
    let executor = executor_for(workspace)?;
    let interviewer = Interviewer::new(&executor, &storage);
    let brief = interviewer.refine(project_id, &parsed, context)?;

    let human = format!(
        "Refinement #{}: {} components, {} open questions{}",
        brief.refinement_iteration,
        brief.components.len(),
        brief.questions.len(),
        if brief.is_ready_for_design() {
            " (ready for design)"
        } else {
            ""
        },
    );
    Ok(Output::new(serde_json::to_value(&brief)?, human))
}

/// Phase 2: design.
pub fn design(workspace: &Path, project_id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let executor = executor_for(workspace)?;
    let architect = Architect::new(&executor, &storage);
    let (components, edges) = architect.execute(project_id)?;

    let human = format!(
        "Designed {} components and {} edges for {}",
        components.len(),
        edges.len(),
        project_id,
    );
    Ok(Output::new(
        json!({"project_id": project_id, "components": components, "edges": edges}),
        human,
    ))
}

/// Phase 4: plan.
pub fn plan(workspace: &Path, project_id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let executor = executor_for(workspace)?;
    let planner = Planner::new(&executor, &storage);
    let work_plan = planner.execute(project_id)?;

    let order = work_plan
        .execution_order
        .iter()
        .map(|e| format!("{}. {}", e.phase, e.label))
        .collect::<Vec<_>>()
        .join("\n");
    let human = format!(
        "Planned {} components.\nBuild order:\n{}",
        work_plan.total_components, order,
    );
    Ok(Output::new(serde_json::to_value(&work_plan)?, human))
}

/// List all projects.
pub fn project_list(workspace: &Path) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let projects = storage.list_projects()?;

    let human = if projects.is_empty() {
        "No projects yet. Run `fm interview \"<description>\"` to start one.".to_string()
    } else {
        projects
            .iter()
            .map(|p| format!("{}  {}  [{}]", p.id, p.name, p.phase))
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Output::new(serde_json::to_value(&projects)?, human))
}

/// Show one project.
pub fn project_show(workspace: &Path, id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let project = storage.get_project(id)?;
    let human = format!(
        "{}  {}  [{}]\n{}",
        project.id,
        project.name,
        project.phase,
        project.summary.as_deref().unwrap_or("(no summary)"),
    );
    Ok(Output::new(serde_json::to_value(&project)?, human))
}

/// Delete a project and everything hanging off it.
pub fn project_delete(workspace: &Path, id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    storage.delete_project(id)?;
    Ok(Output::new(
        json!({"deleted": id}),
        format!("Deleted project {}", id),
    ))
}

/// List a project's components.
pub fn component_list(workspace: &Path, project_id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    // Surface a NotFound for unknown projects rather than an empty list.
    storage.get_project(project_id)?;
    let components = storage.list_components(project_id)?;

    let human = components
        .iter()
        .map(|c| format!("{}  {}  [{}/{}]", c.id, c.label, c.kind, c.status))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Output::new(serde_json::to_value(&components)?, human))
}

/// Show one component.
pub fn component_show(workspace: &Path, id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let comp = storage.get_component(id)?;
    let human = format!(
        "{}  {}  [{}/{}]\n{}",
        comp.id, comp.label, comp.kind, comp.status, comp.summary,
    );
    Ok(Output::new(serde_json::to_value(&comp)?, human))
}

/// Update user-editable fields on a component.
pub fn component_update(
    workspace: &Path,
    id: &str,
    label: Option<&str>,
    status: Option<&str>,
    summary: Option<&str>,
) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let mut comp = storage.get_component(id)?;

    if let Some(label) = label {
        comp.label = label.to_string();
    }
    if let Some(status) = status {
        comp.status = status
            .parse::<ComponentStatus>()
            .map_err(Error::InvalidInput)?;
    }
    if let Some(summary) = summary {
        comp.summary = summary.to_string();
    }
    comp.last_edited = Some(chrono::Utc::now());
    storage.update_component(&comp)?;

    Ok(Output::new(
        serde_json::to_value(&comp)?,
        format!("Updated component {}", id),
    ))
}

/// Add an edge; both endpoints must exist in the project.
pub fn edge_add(
    workspace: &Path,
    project_id: &str,
    from: &str,
    to: &str,
    label: &str,
    kind: &str,
) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let kind = kind.parse::<EdgeKind>().map_err(Error::InvalidInput)?;

    // Same referential rule the normalizer enforces: no dangling edges.
    let components = storage.list_components(project_id)?;
    for endpoint in [from, to] {
        if !components.iter().any(|c| c.id == endpoint) {
            return Err(Error::NotFound(endpoint.to_string()));
        }
    }

    let edge = Edge::new(from.to_string(), to.to_string(), label.to_string(), kind);
    storage.create_edge(project_id, &edge)?;
    Ok(Output::new(
        serde_json::to_value(&edge)?,
        format!("Added edge {} -> {}", from, to),
    ))
}

/// Remove one edge.
pub fn edge_rm(workspace: &Path, project_id: &str, from: &str, to: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let removed = storage.delete_edge(project_id, from, to)?;
    if !removed {
        return Err(Error::NotFound(format!("{} -> {}", from, to)));
    }
    Ok(Output::new(
        json!({"removed": {"from": from, "to": to}}),
        format!("Removed edge {} -> {}", from, to),
    ))
}

/// List a project's edges.
pub fn edge_list(workspace: &Path, project_id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let edges = storage.list_edges(project_id)?;
    let human = edges
        .iter()
        .map(|e| format!("{} -> {} ({}): {}", e.from_id, e.to_id, e.kind, e.label))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Output::new(serde_json::to_value(&edges)?, human))
}

/// Export the full graph interchange document.
pub fn graph_export(workspace: &Path, project_id: &str) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let project = storage.get_project(project_id)?;
    let components = storage.list_components(project_id)?;
    let edges = storage.list_edges(project_id)?;
    let agents = storage.list_agents()?;
    let global_tasks = storage.list_global_tasks(project_id)?;

    let data = GraphData::assemble(&project, components, edges, &agents, &global_tasks);
    let human = format!(
        "{} ({}): {} nodes, {} edges",
        data.project_name,
        data.phase,
        data.nodes.len(),
        data.edges.len(),
    );
    Ok(Output::new(serde_json::to_value(&data)?, human))
}

/// Show the throttle quota for this workspace's configuration.
pub fn throttle_status(workspace: &Path) -> Result<Output> {
    let root = get_storage_dir(workspace)?;
    let config = ForemanConfig::load(&root)?;
    let throttle = CallThrottle::new(config.throttle_config());
    let status = throttle.status();

    let human = format!(
        "Minute window: {}/{} used ({} remaining)\nHour window: {}/{} used ({} remaining)",
        status.minute_calls,
        status.minute_limit,
        status.minute_remaining,
        status.hour_calls,
        status.hour_limit,
        status.hour_remaining,
    );
    Ok(Output::new(serde_json::to_value(&status)?, human))
}

/// Show recent pipeline logs for a project.
pub fn logs(workspace: &Path, project_id: &str, limit: usize) -> Result<Output> {
    let storage = Storage::open(workspace)?;
    let entries = storage.list_logs(project_id, limit)?;
    let human = entries
        .iter()
        .map(|e| {
            format!(
                "[{}] {} {}: {}",
                e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                e.agent_id.as_deref().unwrap_or("-"),
                e.action,
                e.message,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Output::new(serde_json::to_value(&entries)?, human))
}
