//! Dependency-aware build-order scheduling.
//!
//! For each non-root component the scheduler obtains a file/step/test
//! breakdown from the external service (falling back to a deterministic
//! minimal plan when the response is unusable), runs one consistency
//! pass over the full plan set, and emits a topological build order
//! over the predecessor relation.

use serde_json::json;

use crate::agents::prompts;
use crate::executor::{InvokeRequest, ModelInvoker};
use crate::extract;
use crate::models::draft::{PlanDraft, PlanTestDraft, StepDraft, ValidationDraft};
use crate::models::plan::{BuildPlan, PhaseEntry, PlanFile, PlanInterfaces, PlanStep, PlanTest};
use crate::models::{Component, Edge};
use crate::{Error, Result};

/// Per-component plans are regenerated wholesale on every run and the
/// ordering covers all of them, so both come back together.
#[derive(Debug)]
pub struct ScheduleOutcome {
    pub plans: Vec<BuildPlan>,
    pub execution_order: Vec<PhaseEntry>,
    /// Issues reported by the consistency pass
    pub issues: Vec<String>,
}

/// Build-plan scheduler over a component graph.
pub struct Scheduler<'a, I: ModelInvoker> {
    invoker: &'a I,
}

impl<'a, I: ModelInvoker> Scheduler<'a, I> {
    pub fn new(invoker: &'a I) -> Self {
        Self { invoker }
    }

    /// Produce per-component build plans and a dependency-consistent
    /// execution order.
    ///
    /// A cyclic edge set is rejected with `Error::CycleDetected` before
    /// any external call is issued.
    pub fn build_plans(
        &self,
        project_name: &str,
        project_summary: &str,
        components: &[Component],
        edges: &[Edge],
    ) -> Result<ScheduleOutcome> {
        let plannable: Vec<&Component> = components.iter().filter(|c| !c.is_root()).collect();

        // Order first: this validates the graph is acyclic while it is
        // still cheap to abort.
        let execution_order = execution_order(&plannable, edges)?;

        let mut plans = Vec::with_capacity(plannable.len());
        for &comp in &plannable {
            let predecessors = neighbors(components, edges, comp, Direction::Into);
            let successors = neighbors(components, edges, comp, Direction::OutOf);
            plans.push(self.component_plan(comp, &predecessors, &successors)?);
        }

        let (plans, issues) =
            self.consistency_pass(project_name, project_summary, plans, edges)?;

        Ok(ScheduleOutcome {
            plans,
            execution_order,
            issues,
        })
    }

    /// One external call per component; any failure along the
    /// invoke/extract/decode path substitutes the deterministic
    /// fallback so a single bad response never aborts the run.
    fn component_plan(
        &self,
        comp: &Component,
        predecessors: &[NeighborSummary],
        successors: &[NeighborSummary],
    ) -> Result<BuildPlan> {
        let prompt = prompts::COMPONENT_BREAKDOWN
            .replace("{component_json}", &component_context(comp))
            .replace(
                "{upstream_deps}",
                &serde_json::to_string_pretty(predecessors).unwrap_or_default(),
            )
            .replace(
                "{downstream_deps}",
                &serde_json::to_string_pretty(successors).unwrap_or_default(),
            );

        let request = InvokeRequest::new(prompt)
            .with_system(prompts::PLANNER_SYSTEM)
            .expect_json();

        let draft = self
            .call_for_draft::<PlanDraft>(&request)?;

        Ok(match draft {
            Some(draft) => lift_plan(draft, comp),
            None => fallback_plan(comp),
        })
    }

    /// Invoke + extract + decode into `T`. Permanent invoke failures
    /// propagate; everything else collapses to `None` for the caller's
    /// fallback.
    fn call_for_draft<T: serde::de::DeserializeOwned>(
        &self,
        request: &InvokeRequest,
    ) -> Result<Option<T>> {
        let raw = match self.invoker.invoke(request) {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(_) => return Ok(None),
        };
        Ok(extract::extract(&raw)
            .ok()
            .and_then(|value| serde_json::from_value(value).ok()))
    }

    /// Single call over all plans plus all edges. A parseable response
    /// supersedes the individually generated plans; anything else keeps
    /// them untouched.
    fn consistency_pass(
        &self,
        project_name: &str,
        project_summary: &str,
        plans: Vec<BuildPlan>,
        edges: &[Edge],
    ) -> Result<(Vec<BuildPlan>, Vec<String>)> {
        let edges_json: Vec<_> = edges
            .iter()
            .map(|e| json!({"from": e.from_id, "to": e.to_id, "type": e.kind}))
            .collect();

        let prompt = prompts::VALIDATE_PLANS
            .replace("{project_name}", project_name)
            .replace("{project_summary}", project_summary)
            .replace(
                "{plans_json}",
                &serde_json::to_string_pretty(&plans).unwrap_or_default(),
            )
            .replace(
                "{edges_json}",
                &serde_json::to_string_pretty(&edges_json).unwrap_or_default(),
            );

        let request = InvokeRequest::new(prompt)
            .with_system(prompts::VALIDATOR_SYSTEM)
            .expect_json();

        let draft = self.call_for_draft::<ValidationDraft>(&request)?;

        let Some(draft) = draft else {
            return Ok((plans, Vec::new()));
        };

        let revised = match draft.validated_plans {
            Some(revised_drafts) => {
                let lifted: Vec<BuildPlan> = revised_drafts
                    .into_iter()
                    .filter_map(|rd| {
                        let id = rd.component_id.clone()?;
                        let original = plans.iter().find(|p| p.component_id == id)?;
                        Some(lift_revised_plan(rd, original))
                    })
                    .collect();
                // An empty or unmatchable revision set is treated as
                // unparseable output: keep the originals.
                if lifted.is_empty() { plans } else { lifted }
            }
            None => plans,
        };

        Ok((revised, draft.issues))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Into,
    OutOf,
}

/// Summary of a neighboring component for prompt context.
#[derive(Debug, serde::Serialize)]
struct NeighborSummary {
    id: String,
    label: String,
    #[serde(rename = "type")]
    kind: String,
}

fn neighbors(
    components: &[Component],
    edges: &[Edge],
    comp: &Component,
    direction: Direction,
) -> Vec<NeighborSummary> {
    edges
        .iter()
        .filter_map(|e| {
            let other_id = match direction {
                Direction::Into if e.to_id == comp.id => &e.from_id,
                Direction::OutOf if e.from_id == comp.id => &e.to_id,
                _ => return None,
            };
            components.iter().find(|c| &c.id == other_id)
        })
        .map(|c| NeighborSummary {
            id: c.id.clone(),
            label: c.label.clone(),
            kind: c.kind.to_string(),
        })
        .collect()
}

fn component_context(comp: &Component) -> String {
    serde_json::to_string_pretty(&json!({
        "id": comp.id,
        "label": comp.label,
        "type": comp.kind,
        "summary": comp.summary,
        "problem": comp.problem,
        "goals": comp.goals,
        "scope": comp.scope,
        "requirements": comp.requirements,
        "risks": comp.risks,
        "inputs": comp.inputs,
        "outputs": comp.outputs,
        "files": comp.files,
    }))
    .unwrap_or_default()
}

/// Attach identity and tighten a decoded plan draft.
fn lift_plan(draft: PlanDraft, comp: &Component) -> BuildPlan {
    let steps = lift_steps(&draft.steps);
    let tests = draft.tests.iter().map(lift_test).collect();
    BuildPlan {
        component_id: comp.id.clone(),
        component_label: comp.label.clone(),
        files: draft.files,
        steps,
        interfaces: draft.interfaces.unwrap_or_else(|| PlanInterfaces {
            inputs: comp.inputs.clone(),
            outputs: comp.outputs.clone(),
        }),
        tests,
    }
}

/// Lift a consistency-pass revision, keeping identity from the
/// original plan it revises.
fn lift_revised_plan(draft: PlanDraft, original: &BuildPlan) -> BuildPlan {
    let steps = lift_steps(&draft.steps);
    let tests = draft.tests.iter().map(lift_test).collect();
    BuildPlan {
        component_id: original.component_id.clone(),
        component_label: draft
            .component_label
            .clone()
            .unwrap_or_else(|| original.component_label.clone()),
        files: draft.files,
        steps,
        interfaces: draft
            .interfaces
            .unwrap_or_else(|| original.interfaces.clone()),
        tests,
    }
}

fn lift_steps(steps: &[StepDraft]) -> Vec<PlanStep> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| PlanStep {
            description: step.description(),
            order: match step {
                StepDraft::Full {
                    order: Some(order), ..
                } => *order,
                _ => i + 1,
            },
        })
        .collect()
}

fn lift_test(draft: &PlanTestDraft) -> PlanTest {
    match draft {
        PlanTestDraft::Name(name) => PlanTest {
            name: name.clone(),
            kind: "unit".to_string(),
        },
        PlanTestDraft::Full { name, kind } => PlanTest {
            name: name.clone(),
            kind: kind.clone().unwrap_or_else(|| "unit".to_string()),
        },
    }
}

/// Deterministic minimal plan used when the service response is
/// unusable: one source file, one test file, four generic steps.
fn fallback_plan(comp: &Component) -> BuildPlan {
    let slug = slugify(&comp.label);
    BuildPlan {
        component_id: comp.id.clone(),
        component_label: comp.label.clone(),
        files: vec![
            PlanFile {
                path: format!("src/{}/index.py", slug),
                purpose: format!("Main implementation for {}", comp.label),
                dependencies: Vec::new(),
            },
            PlanFile {
                path: format!("tests/test_{}.py", slug),
                purpose: format!("Tests for {}", comp.label),
                dependencies: Vec::new(),
            },
        ],
        steps: vec![
            PlanStep {
                description: "Set up file structure".to_string(),
                order: 1,
            },
            PlanStep {
                description: "Implement core logic".to_string(),
                order: 2,
            },
            PlanStep {
                description: "Add error handling".to_string(),
                order: 3,
            },
            PlanStep {
                description: "Write tests".to_string(),
                order: 4,
            },
        ],
        interfaces: PlanInterfaces {
            inputs: comp.inputs.clone(),
            outputs: comp.outputs.clone(),
        },
        tests: vec![PlanTest {
            name: format!("test_{}_basic", slug),
            kind: "unit".to_string(),
        }],
    }
}

fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Depth-first post-order over the predecessor relation: a component
/// is emitted only after everything it depends on, and phases number
/// up from 1 in emit order.
fn execution_order(plannable: &[&Component], edges: &[Edge]) -> Result<Vec<PhaseEntry>> {
    use std::collections::HashMap;

    let labels: HashMap<&str, &str> = plannable
        .iter()
        .map(|c| (c.id.as_str(), c.label.as_str()))
        .collect();

    let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if labels.contains_key(edge.to_id.as_str()) {
            predecessors
                .entry(edge.to_id.as_str())
                .or_default()
                .push(edge.from_id.as_str());
        }
    }

    let mut states: HashMap<&str, VisitState> = HashMap::new();
    let mut order: Vec<PhaseEntry> = Vec::with_capacity(plannable.len());

    fn visit<'g>(
        id: &'g str,
        labels: &HashMap<&'g str, &'g str>,
        predecessors: &HashMap<&'g str, Vec<&'g str>>,
        states: &mut HashMap<&'g str, VisitState>,
        order: &mut Vec<PhaseEntry>,
    ) -> Result<()> {
        // Predecessors outside the plannable set (the root) are skipped.
        let Some(label) = labels.get(id) else {
            return Ok(());
        };
        match states.get(id) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => return Err(Error::CycleDetected),
            None => {}
        }
        states.insert(id, VisitState::InProgress);

        if let Some(preds) = predecessors.get(id) {
            for pred in preds {
                visit(pred, labels, predecessors, states, order)?;
            }
        }

        states.insert(id, VisitState::Done);
        order.push(PhaseEntry {
            component_id: id.to_string(),
            label: (*label).to_string(),
            phase: order.len() + 1,
        });
        Ok(())
    }

    for comp in plannable {
        visit(
            comp.id.as_str(),
            &labels,
            &predecessors,
            &mut states,
            &mut order,
        )?;
    }

    Ok(order)
}
