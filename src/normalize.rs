//! Graph normalization.
//!
//! Candidate components and edges arrive from the model (or from a
//! fixed fallback) with invented ids, missing fields, and references
//! to components that do not exist. Normalization enforces the graph
//! invariants the rest of the pipeline assumes:
//!
//! - every component id is freshly minted and collision-resistant, so
//!   repeated runs never collide with previously persisted rows
//! - every declared attribute is present (empty/neutral defaults)
//! - exactly one root exists, and every top-level component hangs off it
//! - no edge references a missing component (dropped, never repaired)
//! - every component has a deterministic hierarchical layout position

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::draft::{ComponentDraft, EdgeDraft, MetricDraft};
use crate::models::{
    CheckStatus, Component, ComponentStatus, ComponentType, Edge, EdgeKind, Metric, TestCase,
};

/// Horizontal center of the layout canvas.
const CANVAS_CENTER_X: i64 = 500;
/// Horizontal spacing between siblings on one level.
const NODE_SPACING: i64 = 200;
/// Vertical offset of level 0.
const BASE_Y: i64 = 50;
/// Vertical distance between levels.
const ROW_HEIGHT: i64 = 150;

/// Mints collision-resistant component ids for one normalization pass.
///
/// Each pass seeds a fresh nonce (uuid + timestamp nanos), so two
/// passes over identical input produce disjoint id sets.
struct IdMinter {
    nonce: String,
    counter: usize,
}

impl IdMinter {
    fn new() -> Self {
        Self {
            nonce: format!(
                "{}-{}",
                uuid::Uuid::new_v4().simple(),
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
            ),
            counter: 0,
        }
    }

    /// Next id in the pass: `fc-` + 8 hex chars.
    fn next(&mut self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.nonce.as_bytes());
        hasher.update(self.counter.to_le_bytes());
        self.counter += 1;
        let hash = hasher.finalize();
        let hex = format!("{:x}", hash);
        format!("fc-{}", &hex[..8])
    }
}

/// Normalize a candidate graph into a consistent, laid-out one.
pub fn normalize(
    components: Vec<ComponentDraft>,
    edges: Vec<EdgeDraft>,
    project_title: &str,
    project_summary: &str,
) -> (Vec<Component>, Vec<Edge>) {
    let mut minter = IdMinter::new();
    let mut id_map: HashMap<String, String> = HashMap::new();
    let mut normalized: Vec<Component> = Vec::with_capacity(components.len());

    for (i, draft) in components.into_iter().enumerate() {
        let old_id = draft.id.clone().unwrap_or_else(|| format!("comp_{}", i));
        let new_id = minter.next();
        id_map.insert(old_id, new_id.clone());
        normalized.push(lift_component(draft, new_id, i));
    }

    let mut edges: Vec<Edge> = edges
        .into_iter()
        .filter_map(|draft| lift_edge(draft, &id_map))
        .collect();

    ensure_root(
        &mut normalized,
        &mut edges,
        &mut minter,
        project_title,
        project_summary,
    );

    // Referential integrity: both endpoints must exist. Dangling edges
    // are dropped, never repaired.
    let known: HashSet<&str> = normalized.iter().map(|c| c.id.as_str()).collect();
    edges.retain(|e| known.contains(e.from_id.as_str()) && known.contains(e.to_id.as_str()));

    assign_layout(&mut normalized, &edges);

    (normalized, edges)
}

/// Convert a draft into a fully defaulted component under a fresh id.
fn lift_component(draft: ComponentDraft, id: String, index: usize) -> Component {
    let kind = draft
        .kind
        .as_deref()
        .and_then(|s| s.parse::<ComponentType>().ok())
        .unwrap_or_default();
    let status = draft
        .status
        .as_deref()
        .and_then(|s| s.parse::<ComponentStatus>().ok())
        .unwrap_or_default();

    Component {
        id,
        label: draft
            .label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| format!("Component {}", index + 1)),
        kind,
        status,
        x: 0,
        y: 0,
        summary: draft.summary.unwrap_or_default(),
        problem: draft.problem.unwrap_or_default(),
        goals: draft.goals,
        scope: draft.scope,
        requirements: draft.requirements,
        risks: draft.risks,
        inputs: draft.inputs,
        outputs: draft.outputs,
        files: draft.files,
        subtasks: Vec::new(),
        metrics: draft.metrics.into_iter().map(lift_metric).collect(),
        test_cases: draft
            .test_cases
            .iter()
            .map(|tc| TestCase::new(tc.name()))
            .collect(),
        agent_id: None,
        last_edited: None,
    }
}

fn lift_metric(draft: MetricDraft) -> Metric {
    Metric {
        requirement: draft
            .requirement
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "Requirement".to_string()),
        value: draft.value.unwrap_or_default(),
        status: match draft.status.as_deref() {
            Some("pass") => CheckStatus::Pass,
            Some("fail") => CheckStatus::Fail,
            _ => CheckStatus::Pending,
        },
        weight: draft.weight.unwrap_or(1.0),
    }
}

/// Rewrite a draft edge through the id map. Endpoints the map does not
/// know are kept as-is and removed by the integrity pass.
fn lift_edge(draft: EdgeDraft, id_map: &HashMap<String, String>) -> Option<Edge> {
    let from = draft.from?;
    let to = draft.to?;
    let from_id = id_map.get(&from).cloned().unwrap_or(from);
    let to_id = id_map.get(&to).cloned().unwrap_or(to);
    Some(Edge {
        from_id,
        to_id,
        label: draft.label.unwrap_or_default(),
        kind: draft
            .kind
            .as_deref()
            .and_then(|s| s.parse::<EdgeKind>().ok())
            .unwrap_or_default(),
    })
}

/// Synthesize a root when the candidate set has none, and connect every
/// component without an incoming edge to it so the graph stays weakly
/// connected from the root.
fn ensure_root(
    components: &mut Vec<Component>,
    edges: &mut Vec<Edge>,
    minter: &mut IdMinter,
    title: &str,
    summary: &str,
) {
    if components.iter().any(Component::is_root) {
        return;
    }

    let root_id = minter.next();
    let mut root = Component::new(root_id.clone(), title.to_string());
    root.kind = ComponentType::Root;
    root.status = ComponentStatus::Active;
    root.summary = summary.to_string();
    root.inputs = vec!["User Request".to_string()];
    root.outputs = vec!["Completed System".to_string()];

    let with_incoming: HashSet<&str> = edges.iter().map(|e| e.to_id.as_str()).collect();
    let orphan_ids: Vec<String> = components
        .iter()
        .filter(|c| !with_incoming.contains(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect();

    for id in orphan_ids {
        edges.push(Edge {
            from_id: root_id.clone(),
            to_id: id,
            label: "Contains".to_string(),
            kind: EdgeKind::Data,
        });
    }

    components.insert(0, root);
}

/// Assign levels by BFS from the root (edges read parent -> child) and
/// spread each level evenly around the horizontal center.
fn assign_layout(components: &mut [Component], edges: &[Edge]) {
    if components.is_empty() {
        return;
    }

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        children
            .entry(edge.from_id.as_str())
            .or_default()
            .push(edge.to_id.as_str());
    }

    let root_id = components
        .iter()
        .find(|c| c.is_root())
        .map(|c| c.id.clone())
        .unwrap_or_else(|| components[0].id.clone());

    let mut levels: HashMap<String, usize> = HashMap::new();
    levels.insert(root_id.clone(), 0);
    let mut queue = VecDeque::from([root_id]);
    while let Some(current) = queue.pop_front() {
        let level = levels[&current];
        if let Some(kids) = children.get(current.as_str()) {
            for child in kids {
                if !levels.contains_key(*child) {
                    levels.insert((*child).to_string(), level + 1);
                    queue.push_back((*child).to_string());
                }
            }
        }
    }

    // Components unreachable from the root sit at level 1 as orphans.
    let level_of = |c: &Component| levels.get(&c.id).copied().unwrap_or(1);

    let mut by_level: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, comp) in components.iter().enumerate() {
        by_level.entry(level_of(comp)).or_default().push(idx);
    }

    for (level, indices) in by_level {
        let y = BASE_Y + (level as i64) * ROW_HEIGHT;
        let width = indices.len() as i64 * NODE_SPACING;
        let start_x = CANVAS_CENTER_X - width / 2 + 100;
        for (slot, idx) in indices.into_iter().enumerate() {
            components[idx].x = start_x + slot as i64 * NODE_SPACING;
            components[idx].y = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str, label: &str) -> ComponentDraft {
        ComponentDraft {
            id: Some(id.to_string()),
            label: Some(label.to_string()),
            ..Default::default()
        }
    }

    fn edge_draft(from: &str, to: &str) -> EdgeDraft {
        EdgeDraft {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            label: None,
            kind: None,
        }
    }

    #[test]
    fn test_ids_are_rewritten_and_edges_follow() {
        let (components, edges) = normalize(
            vec![draft("a", "A"), draft("b", "B")],
            vec![edge_draft("a", "b")],
            "Proj",
            "",
        );

        // Root synthesized + two components.
        assert_eq!(components.len(), 3);
        assert!(components.iter().all(|c| c.id.starts_with("fc-")));

        // The a->b edge survived under new ids.
        let a = components.iter().find(|c| c.label == "A").unwrap();
        let b = components.iter().find(|c| c.label == "B").unwrap();
        assert!(
            edges
                .iter()
                .any(|e| e.from_id == a.id && e.to_id == b.id)
        );
    }

    #[test]
    fn test_two_runs_mint_disjoint_ids() {
        let run = || {
            let (components, _) =
                normalize(vec![draft("a", "A"), draft("b", "B")], vec![], "P", "");
            components
                .into_iter()
                .map(|c| c.id)
                .collect::<std::collections::HashSet<_>>()
        };
        let first = run();
        let second = run();
        assert!(first.is_disjoint(&second));
    }

    #[test]
    fn test_dangling_edge_dropped_others_kept() {
        let (components, edges) = normalize(
            vec![draft("a", "A"), draft("b", "B")],
            vec![edge_draft("a", "b"), edge_draft("a", "ghost")],
            "P",
            "",
        );

        let a = components.iter().find(|c| c.label == "A").unwrap();
        let b = components.iter().find(|c| c.label == "B").unwrap();
        // Exactly the dangling edge is gone; a->b and the root edge remain.
        assert!(edges.iter().any(|e| e.from_id == a.id && e.to_id == b.id));
        assert!(!edges.iter().any(|e| e.to_id == "ghost"));
    }

    #[test]
    fn test_root_synthesized_when_missing() {
        let (components, edges) = normalize(
            vec![draft("a", "A"), draft("b", "B")],
            vec![edge_draft("a", "b")],
            "My Project",
            "A summary",
        );

        let roots: Vec<_> = components.iter().filter(|c| c.is_root()).collect();
        assert_eq!(roots.len(), 1);
        let root = roots[0];
        assert_eq!(root.label, "My Project");
        assert_eq!(root.summary, "A summary");
        assert_eq!(root.status, ComponentStatus::Active);

        // A had no incoming edge, so the root now feeds it; B already
        // had one and gains nothing.
        let a = components.iter().find(|c| c.label == "A").unwrap();
        let b = components.iter().find(|c| c.label == "B").unwrap();
        assert!(edges.iter().any(|e| e.from_id == root.id && e.to_id == a.id));
        assert!(!edges.iter().any(|e| e.from_id == root.id && e.to_id == b.id));
    }

    #[test]
    fn test_existing_root_kept() {
        let mut root = draft("r", "Existing Root");
        root.kind = Some("root".to_string());
        let (components, _) = normalize(vec![root, draft("a", "A")], vec![], "Title", "");

        assert_eq!(components.iter().filter(|c| c.is_root()).count(), 1);
        assert_eq!(
            components.iter().find(|c| c.is_root()).unwrap().label,
            "Existing Root"
        );
    }

    #[test]
    fn test_field_defaulting() {
        let (components, _) = normalize(vec![ComponentDraft::default()], vec![], "P", "");
        let comp = components.iter().find(|c| !c.is_root()).unwrap();
        assert_eq!(comp.label, "Component 1");
        assert_eq!(comp.status, ComponentStatus::Pending);
        assert!(comp.goals.is_empty());
        assert!(comp.metrics.is_empty());
    }

    #[test]
    fn test_metric_and_test_case_lifting() {
        let mut d = draft("a", "A");
        d.metrics = vec![MetricDraft {
            requirement: None,
            value: None,
            status: Some("pass".to_string()),
            weight: None,
        }];
        d.test_cases =
            serde_json::from_str(r#"["smoke test", {"name": "full test"}]"#).unwrap();

        let (components, _) = normalize(vec![d], vec![], "P", "");
        let comp = components.iter().find(|c| c.label == "A").unwrap();
        assert_eq!(comp.metrics[0].requirement, "Requirement");
        assert_eq!(comp.metrics[0].status, CheckStatus::Pass);
        assert_eq!(comp.metrics[0].weight, 1.0);
        assert_eq!(comp.test_cases.len(), 2);
        assert_eq!(comp.test_cases[0].name, "smoke test");
        assert_eq!(comp.test_cases[0].weight, 1.0);
    }

    #[test]
    fn test_layout_levels() {
        let (components, _) = normalize(
            vec![draft("a", "A"), draft("b", "B"), draft("c", "C")],
            vec![edge_draft("a", "b"), edge_draft("b", "c")],
            "P",
            "",
        );

        let y_of = |label: &str| components.iter().find(|c| c.label == label).unwrap().y;
        let root_y = components.iter().find(|c| c.is_root()).unwrap().y;

        assert_eq!(root_y, BASE_Y);
        // Chain root -> A -> B -> C descends one row per level.
        assert_eq!(y_of("A"), BASE_Y + ROW_HEIGHT);
        assert_eq!(y_of("B"), BASE_Y + 2 * ROW_HEIGHT);
        assert_eq!(y_of("C"), BASE_Y + 3 * ROW_HEIGHT);
    }

    #[test]
    fn test_orphans_assigned_level_one() {
        // An edge cycle between b and c leaves both with incoming edges,
        // so neither hangs off the root and BFS never reaches them.
        let (components, _) = normalize(
            vec![draft("a", "A"), draft("b", "B"), draft("c", "C")],
            vec![edge_draft("b", "c"), edge_draft("c", "b")],
            "P",
            "",
        );

        let y_of = |label: &str| components.iter().find(|c| c.label == label).unwrap().y;
        assert_eq!(y_of("B"), BASE_Y + ROW_HEIGHT);
        assert_eq!(y_of("C"), BASE_Y + ROW_HEIGHT);
    }

    #[test]
    fn test_layout_deterministic() {
        let run = || {
            normalize(
                vec![draft("a", "A"), draft("b", "B"), draft("c", "C")],
                vec![edge_draft("a", "b"), edge_draft("a", "c")],
                "P",
                "",
            )
        };
        let (first, _) = run();
        let (second, _) = run();
        let coords = |cs: &[Component]| {
            cs.iter()
                .map(|c| (c.label.clone(), c.x, c.y))
                .collect::<Vec<_>>()
        };
        assert_eq!(coords(&first), coords(&second));
    }

    #[test]
    fn test_siblings_spread_around_center() {
        let (components, _) = normalize(
            vec![draft("a", "A"), draft("b", "B")],
            vec![],
            "P",
            "",
        );
        let a = components.iter().find(|c| c.label == "A").unwrap();
        let b = components.iter().find(|c| c.label == "B").unwrap();
        assert_eq!(a.y, b.y);
        assert_eq!((b.x - a.x).abs(), NODE_SPACING);
    }
}
