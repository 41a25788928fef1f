//! Graph interchange format consumed by the visualization layer.

use serde::{Deserialize, Serialize};

use crate::models::{AgentRecord, Component, Edge, GlobalTask, Project};

/// One checklist entry in the interchange document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphTask {
    pub text: String,
    pub done: bool,
}

/// One agent entry in the interchange document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAgent {
    pub id: String,
    pub name: String,
    pub dept: String,
    pub initials: String,
    pub status: String,
}

impl From<&AgentRecord> for GraphAgent {
    fn from(agent: &AgentRecord) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            dept: agent.dept.to_string(),
            initials: agent.initials.clone(),
            status: serde_json::to_value(agent.status)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_else(|| "idle".to_string()),
        }
    }
}

/// The full graph document handed to the visualization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub project_name: String,
    pub project_summary: String,
    pub phase: String,
    pub global_tasks: Vec<GraphTask>,
    pub agents: Vec<GraphAgent>,
    pub nodes: Vec<Component>,
    pub edges: Vec<Edge>,
}

impl GraphData {
    /// Assemble the interchange document from storage rows.
    pub fn assemble(
        project: &Project,
        components: Vec<Component>,
        edges: Vec<Edge>,
        agents: &[AgentRecord],
        global_tasks: &[GlobalTask],
    ) -> Self {
        Self {
            project_name: project.name.clone(),
            project_summary: project.summary.clone().unwrap_or_default(),
            phase: project.phase.to_string(),
            global_tasks: global_tasks
                .iter()
                .map(|t| GraphTask {
                    text: t.text.clone(),
                    done: t.done,
                })
                .collect(),
            agents: agents.iter().map(GraphAgent::from).collect(),
            nodes: components,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentStatus, Dept, EdgeKind};

    #[test]
    fn test_graph_data_camel_case() {
        let project = Project::new("fp-1".to_string(), "Demo".to_string());
        let data = GraphData::assemble(&project, vec![], vec![], &[], &[]);
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"projectName\":\"Demo\""));
        assert!(json.contains("\"projectSummary\""));
        assert!(json.contains("\"globalTasks\""));
        assert!(json.contains("\"phase\":\"interview\""));
    }

    #[test]
    fn test_graph_agent_from_record() {
        let record = AgentRecord {
            id: "architect_1234".to_string(),
            name: "Architect".to_string(),
            dept: Dept::Des,
            initials: "AR".to_string(),
            status: AgentStatus::Complete,
        };
        let agent = GraphAgent::from(&record);
        assert_eq!(agent.dept, "DES");
        assert_eq!(agent.status, "complete");
    }

    #[test]
    fn test_graph_data_carries_nodes_and_edges() {
        let project = Project::new("fp-1".to_string(), "Demo".to_string());
        let comp = Component::new("fc-1".to_string(), "Core".to_string());
        let edge = Edge::new(
            "fc-1".to_string(),
            "fc-2".to_string(),
            String::new(),
            EdgeKind::Data,
        );
        let data = GraphData::assemble(&project, vec![comp], vec![edge], &[], &[]);
        assert_eq!(data.nodes.len(), 1);
        assert_eq!(data.edges.len(), 1);
    }
}
