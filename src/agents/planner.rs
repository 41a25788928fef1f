//! Plan phase: per-component build plans and a validated build order.

use chrono::Utc;

use crate::agents::{PhaseAgent, ScopedContext, log, new_agent_id, record_complete};
use crate::executor::ModelInvoker;
use crate::models::plan::WorkPlan;
use crate::models::{CheckStatus, Dept, LogLevel, Manager, PipelinePhase, Subtask};
use crate::schedule::Scheduler;
use crate::storage::{Storage, generate_id};
use crate::Result;

/// Drives the Plan phase (the general manager).
pub struct Planner<'a, I: ModelInvoker> {
    agent_id: String,
    invoker: &'a I,
    storage: &'a Storage,
}

impl<I: ModelInvoker> PhaseAgent for Planner<'_, I> {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn display_name(&self) -> &'static str {
        "General Manager"
    }

    fn dept(&self) -> Dept {
        Dept::Mgt
    }

    fn initials(&self) -> &'static str {
        "GM"
    }

    fn scoped_context(&self) -> ScopedContext {
        ScopedContext {
            role: "general_manager",
            access: vec!["components", "edges", "project_summary"],
            restrictions: vec!["no_code_access", "no_task_details"],
        }
    }
}

impl<'a, I: ModelInvoker> Planner<'a, I> {
    pub fn new(invoker: &'a I, storage: &'a Storage) -> Self {
        Self {
            agent_id: new_agent_id("gm"),
            invoker,
            storage,
        }
    }

    /// Create build plans for every component and a dependency-ordered
    /// schedule, then persist both.
    pub fn execute(&self, project_id: &str) -> Result<WorkPlan> {
        let mut project = self.storage.get_project(project_id)?;
        let components = self.storage.list_components(project_id)?;
        let edges = self.storage.list_edges(project_id)?;

        let plannable = components.iter().filter(|c| !c.is_root()).count();
        log(
            self.storage,
            &self.agent_id,
            Some(project_id),
            "start",
            &format!("Found {} components to plan", plannable),
            LogLevel::Info,
        );

        let scheduler = Scheduler::new(self.invoker);
        let summary = project.summary.clone().unwrap_or_default();
        let outcome = scheduler.build_plans(&project.name, &summary, &components, &edges)?;

        for issue in &outcome.issues {
            log(
                self.storage,
                &self.agent_id,
                Some(project_id),
                "plan_issue",
                issue,
                LogLevel::Warn,
            );
        }

        // Write each plan onto its component as subtasks.
        for plan in &outcome.plans {
            let Ok(mut comp) = self.storage.get_component(&plan.component_id) else {
                continue;
            };
            comp.subtasks = plan_subtasks(plan);
            self.storage.update_component(&comp)?;
        }

        // One manager per planned component; re-planning replaces them.
        self.storage.delete_managers(project_id)?;
        for plan in &outcome.plans {
            let manager = Manager {
                id: generate_id("fmgr", &plan.component_id),
                project_id: project_id.to_string(),
                component_id: plan.component_id.clone(),
                status: crate::models::ComponentStatus::Pending,
                created_by: Some(self.agent_id.clone()),
                created_at: Utc::now(),
            };
            self.storage.create_manager(&manager)?;
        }

        let work_plan = WorkPlan {
            created_at: Utc::now(),
            created_by: self.agent_id.clone(),
            total_components: outcome.plans.len(),
            execution_order: outcome.execution_order,
            component_plans: outcome.plans,
        };

        project.work_plan = Some(serde_json::to_string(&work_plan)?);
        project.phase = PipelinePhase::Planning;
        self.storage.update_project(&project)?;
        self.storage.mark_global_task_done(project_id, "Phase 4")?;
        record_complete(self.storage, self);

        log(
            self.storage,
            &self.agent_id,
            Some(project_id),
            "complete",
            &format!(
                "Created plans for {} components",
                work_plan.total_components
            ),
            LogLevel::Info,
        );

        Ok(work_plan)
    }
}

/// Flatten a build plan into component subtasks.
fn plan_subtasks(plan: &crate::models::plan::BuildPlan) -> Vec<Subtask> {
    let mut subtasks = Vec::new();
    for file in &plan.files {
        subtasks.push(Subtask::File {
            path: file.path.clone(),
            purpose: file.purpose.clone(),
            status: CheckStatus::Pending,
            dependencies: file.dependencies.clone(),
        });
    }
    for step in &plan.steps {
        subtasks.push(Subtask::Step {
            order: step.order,
            description: step.description.clone(),
            status: CheckStatus::Pending,
        });
    }
    for test in &plan.tests {
        subtasks.push(Subtask::Test {
            name: test.name.clone(),
            status: CheckStatus::Pending,
        });
    }
    subtasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedInvoker;
    use crate::models::{Component, ComponentType, Edge, EdgeKind, GlobalTask, Project};
    use crate::test_utils::TestEnv;

    fn seed_graph(storage: &Storage) {
        let mut project = Project::new("fp-1".to_string(), "Pipeline".to_string());
        project.summary = Some("ETL pipeline".to_string());
        storage.create_project(&project).unwrap();
        storage
            .create_global_task(
                "fp-1",
                &GlobalTask {
                    text: "Phase 4: Plan - Work plan and build order".to_string(),
                    done: false,
                    sort_order: 3,
                },
            )
            .unwrap();

        let mut root = Component::new("fc-root".to_string(), "Pipeline".to_string());
        root.kind = ComponentType::Root;
        storage.create_component("fp-1", &root).unwrap();
        for (id, label) in [("fc-a", "Extract"), ("fc-b", "Transform"), ("fc-c", "Load")] {
            storage
                .create_component("fp-1", &Component::new(id.to_string(), label.to_string()))
                .unwrap();
        }
        for (from, to) in [("fc-root", "fc-a"), ("fc-a", "fc-b"), ("fc-b", "fc-c")] {
            storage
                .create_edge(
                    "fp-1",
                    &Edge::new(from.to_string(), to.to_string(), String::new(), EdgeKind::Data),
                )
                .unwrap();
        }
    }

    #[test]
    fn test_execute_persists_plans_and_order() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        seed_graph(&storage);

        // Every call fails to parse: fallback plans throughout.
        let invoker = ScriptedInvoker::always("beep boop");
        let planner = Planner::new(&invoker, &storage);
        let work_plan = planner.execute("fp-1").unwrap();

        assert_eq!(work_plan.total_components, 3);
        let order: Vec<(&str, usize)> = work_plan
            .execution_order
            .iter()
            .map(|e| (e.label.as_str(), e.phase))
            .collect();
        assert_eq!(
            order,
            vec![("Extract", 1), ("Transform", 2), ("Load", 3)]
        );

        // Subtasks landed on components: 2 files + 4 steps + 1 test.
        let comp = storage.get_component("fc-a").unwrap();
        assert_eq!(comp.subtasks.len(), 7);

        // Managers created, one per planned component.
        let managers = storage.list_managers("fp-1").unwrap();
        assert_eq!(managers.len(), 3);

        let project = storage.get_project("fp-1").unwrap();
        assert_eq!(project.phase, PipelinePhase::Planning);
        let stored: WorkPlan = serde_json::from_str(&project.work_plan.unwrap()).unwrap();
        assert_eq!(stored.total_components, 3);
        assert!(storage.list_global_tasks("fp-1").unwrap()[0].done);
    }

    #[test]
    fn test_execute_rejects_cyclic_graph() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let project = Project::new("fp-1".to_string(), "Cyclic".to_string());
        storage.create_project(&project).unwrap();
        for (id, label) in [("fc-a", "A"), ("fc-b", "B")] {
            storage
                .create_component("fp-1", &Component::new(id.to_string(), label.to_string()))
                .unwrap();
        }
        for (from, to) in [("fc-a", "fc-b"), ("fc-b", "fc-a")] {
            storage
                .create_edge(
                    "fp-1",
                    &Edge::new(from.to_string(), to.to_string(), String::new(), EdgeKind::Data),
                )
                .unwrap();
        }

        let invoker = ScriptedInvoker::always("{}");
        let planner = Planner::new(&invoker, &storage);
        let err = planner.execute("fp-1").unwrap_err();
        assert!(matches!(err, crate::Error::CycleDetected));
        // Nothing was persisted: the project phase is untouched.
        assert_eq!(
            storage.get_project("fp-1").unwrap().phase,
            PipelinePhase::Interview
        );
    }

    #[test]
    fn test_replan_replaces_managers() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        seed_graph(&storage);

        let invoker = ScriptedInvoker::always("junk");
        let planner = Planner::new(&invoker, &storage);
        planner.execute("fp-1").unwrap();
        let first: Vec<String> = storage
            .list_managers("fp-1")
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();

        planner.execute("fp-1").unwrap();
        let second: Vec<String> = storage
            .list_managers("fp-1")
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(second.len(), 3);
        assert!(second.iter().all(|id| !first.contains(id)));
    }
}
