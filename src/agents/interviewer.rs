//! Interview phase: turn a free-text description into a structured brief.

use chrono::Utc;
use serde::Serialize;

use crate::agents::{PhaseAgent, ScopedContext, log, new_agent_id, prompts, record_complete};
use crate::executor::{InvokeRequest, ModelInvoker};
use crate::extract;
use crate::models::draft::{BriefDraft, ComponentDraft};
use crate::models::{Component, Dept, Edge, GlobalTask, LogLevel, PipelinePhase, Project};
use crate::normalize;
use crate::storage::{Storage, generate_id};
use crate::Result;

/// The seven global pipeline phases seeded on every new project.
const GLOBAL_PHASES: &[&str] = &[
    "Phase 1: Interview - Gather requirements",
    "Phase 2: Design - Create component tree",
    "Phase 3: Visualize - User reviews design",
    "Phase 4: Plan - Work plan and build order",
    "Phase 5: Breakdown - Managers create tasks",
    "Phase 6: Assign - Managers assign agents",
    "Phase 7: Execute - Agents complete tasks",
];

/// Questions guaranteed on a first pass so the clarify round always runs.
const STOCK_QUESTIONS: &[&str] = &[
    "What is the expected scale of this project (number of users, data volume)?",
    "Are there any specific technologies or frameworks you prefer or need to integrate with?",
    "What are the most critical features that must work perfectly?",
    "Are there any security, compliance, or regulatory requirements to consider?",
];

/// A normalized project brief, persisted and returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Brief {
    pub project_id: String,
    pub title: String,
    pub summary: String,
    pub problem: String,
    pub goals: Vec<String>,
    pub components: Vec<Component>,
    pub edges: Vec<Edge>,
    pub global_requirements: Vec<String>,
    pub global_risks: Vec<String>,
    pub questions: Vec<String>,
    pub refinement_iteration: u32,
}

impl Brief {
    /// Ready for the Design phase once at least one refinement round
    /// has answered all open questions and the graph has real shape.
    pub fn is_ready_for_design(&self) -> bool {
        let real_components = self.components.iter().filter(|c| !c.is_root()).count();
        self.refinement_iteration >= 1
            && self.questions.is_empty()
            && real_components >= 2
            && !self.goals.is_empty()
    }
}

/// Drives the Interview phase.
pub struct Interviewer<'a, I: ModelInvoker> {
    agent_id: String,
    invoker: &'a I,
    storage: &'a Storage,
}

impl<I: ModelInvoker> PhaseAgent for Interviewer<'_, I> {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn display_name(&self) -> &'static str {
        "Interviewer"
    }

    fn dept(&self) -> Dept {
        Dept::Disc
    }

    fn initials(&self) -> &'static str {
        "IN"
    }

    fn scoped_context(&self) -> ScopedContext {
        ScopedContext {
            role: "interviewer",
            access: vec!["user_input"],
            restrictions: vec!["no_existing_code", "no_other_agents"],
        }
    }
}

impl<'a, I: ModelInvoker> Interviewer<'a, I> {
    pub fn new(invoker: &'a I, storage: &'a Storage) -> Self {
        Self {
            agent_id: new_agent_id("interviewer"),
            invoker,
            storage,
        }
    }

    /// Analyze a project description and persist a structured brief.
    ///
    /// With `project_id` set, the existing project is updated and its
    /// graph fully replaced; otherwise a new project is created.
    pub fn execute(&self, description: &str, project_id: Option<&str>) -> Result<Brief> {
        let request = InvokeRequest::new(
            prompts::INTERVIEWER_ANALYZE.replace("{description}", description),
        )
        .with_system(prompts::INTERVIEWER_SYSTEM)
        .expect_json();

        let draft = match self.run_brief_call(&request, project_id)? {
            Some(draft) => draft,
            None => fallback_brief(description),
        };

        let mut brief = self.normalize_brief(draft, description, 0);

        // A first analysis always leaves questions open so the clarify
        // round is shown.
        if brief.questions.is_empty() {
            brief.questions = STOCK_QUESTIONS.iter().map(|q| q.to_string()).collect();
        }

        let transcript = format!(
            "[{}] USER:\n{}\n\n[{}] INTERVIEWER:\nAnalyzed project and identified {} components.\n{}",
            Utc::now().to_rfc3339(),
            description,
            Utc::now().to_rfc3339(),
            brief.components.iter().filter(|c| !c.is_root()).count(),
            format_questions(&brief.questions),
        );

        let id = self.save(&mut brief, project_id, &transcript)?;
        brief.project_id = id;

        log(
            self.storage,
            &self.agent_id,
            Some(&brief.project_id),
            "complete",
            &format!("Generated brief with {} components", brief.components.len()),
            LogLevel::Info,
        );
        record_complete(self.storage, self);

        Ok(brief)
    }

    /// Refine an existing brief from answers to the open questions.
    ///
    /// On any invoke/extract failure the stored graph is kept untouched
    /// and only the transcript and iteration count advance.
    pub fn refine(
        &self,
        project_id: &str,
        answers: &[(String, String)],
        additional_context: &str,
    ) -> Result<Brief> {
        let mut project = self.storage.get_project(project_id)?;
        let components = self.storage.list_components(project_id)?;

        let qa_section = answers
            .iter()
            .map(|(q, a)| format!("Q: {}\nA: {}", q, a))
            .collect::<Vec<_>>()
            .join("\n");
        let labels = components
            .iter()
            .filter(|c| !c.is_root())
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = prompts::INTERVIEWER_REFINE
            .replace("{summary}", project.summary.as_deref().unwrap_or(""))
            .replace("{component_labels}", &labels)
            .replace("{qa_section}", &qa_section)
            .replace(
                "{additional_context}",
                &if additional_context.is_empty() {
                    String::new()
                } else {
                    format!("ADDITIONAL CONTEXT FROM USER: {}", additional_context)
                },
            );

        let request = InvokeRequest::new(prompt)
            .with_system(prompts::INTERVIEWER_SYSTEM)
            .expect_json();

        let iteration = project.refinement_iteration + 1;
        let mut transcript = format!("\n[{}] REFINEMENT #{}:\n", Utc::now().to_rfc3339(), iteration);
        for (q, a) in answers {
            transcript.push_str(&format!("Q: {}\nA: {}\n\n", q, a));
        }
        if !additional_context.is_empty() {
            transcript.push_str(&format!("Additional context: {}\n", additional_context));
        }

        match self.run_brief_call(&request, Some(project_id))? {
            Some(draft) => {
                let summary = project.summary.clone().unwrap_or_default();
                let mut brief = self.normalize_brief(draft, &summary, iteration);
                transcript.push_str(&format!(
                    "[{}] INTERVIEWER:\nRefined to {} components.\n{}",
                    Utc::now().to_rfc3339(),
                    brief.components.iter().filter(|c| !c.is_root()).count(),
                    format_questions(&brief.questions),
                ));
                let id = self.save(&mut brief, Some(project_id), &transcript)?;
                brief.project_id = id;

                log(
                    self.storage,
                    &self.agent_id,
                    Some(project_id),
                    "refine_complete",
                    &format!("Refined to {} components", brief.components.len()),
                    LogLevel::Info,
                );
                Ok(brief)
            }
            None => {
                // Keep the stored graph; just advance the bookkeeping.
                transcript.push_str(&format!(
                    "[{}] INTERVIEWER:\nRefinement failed; keeping previous brief.\n",
                    Utc::now().to_rfc3339(),
                ));
                project.transcript = Some(format!(
                    "{}{}",
                    project.transcript.clone().unwrap_or_default(),
                    transcript
                ));
                project.refinement_iteration = iteration;
                self.storage.update_project(&project)?;

                let edges = self.storage.list_edges(project_id)?;
                Ok(Brief {
                    project_id: project_id.to_string(),
                    title: project.name.clone(),
                    summary: project.summary.clone().unwrap_or_default(),
                    problem: project.problem.clone().unwrap_or_default(),
                    goals: components
                        .iter()
                        .find(|c| c.is_root())
                        .map(|c| c.goals.clone())
                        .unwrap_or_default(),
                    components,
                    edges,
                    global_requirements: Vec::new(),
                    global_risks: Vec::new(),
                    questions: project.questions.clone(),
                    refinement_iteration: iteration,
                })
            }
        }
    }

    /// Invoke + extract + decode. A missing executable propagates as a
    /// fatal error; every other failure collapses to None so the caller
    /// substitutes its fallback.
    fn run_brief_call(
        &self,
        request: &InvokeRequest,
        project_id: Option<&str>,
    ) -> Result<Option<BriefDraft>> {
        let raw = match self.invoker.invoke(request) {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                log(
                    self.storage,
                    &self.agent_id,
                    project_id,
                    "error",
                    &format!("Model call failed: {}", e),
                    LogLevel::Error,
                );
                return Ok(None);
            }
        };
        match extract::extract(&raw) {
            Ok(value) => Ok(serde_json::from_value(value).ok()),
            Err(e) => {
                log(
                    self.storage,
                    &self.agent_id,
                    project_id,
                    "error",
                    &format!("Brief extraction failed: {}", e),
                    LogLevel::Error,
                );
                Ok(None)
            }
        }
    }

    fn normalize_brief(&self, draft: BriefDraft, description: &str, iteration: u32) -> Brief {
        let title = draft
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled Project".to_string());
        let summary = draft
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| truncate(description, 200));
        let problem = draft
            .problem
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "Not specified".to_string());

        let (components, edges) = normalize::normalize(draft.components, draft.edges, &title, &summary);

        Brief {
            project_id: String::new(),
            title,
            summary,
            problem,
            goals: draft.goals,
            components,
            edges,
            global_requirements: draft.global_requirements,
            global_risks: draft.global_risks,
            questions: draft.questions,
            refinement_iteration: iteration,
        }
    }

    /// Persist the brief: create or update the project, then fully
    /// replace its graph (delete-then-insert).
    fn save(&self, brief: &mut Brief, project_id: Option<&str>, transcript: &str) -> Result<String> {
        let id = match project_id {
            Some(id) => {
                let mut project = self.storage.get_project(id)?;
                project.name = brief.title.clone();
                project.summary = Some(brief.summary.clone());
                project.problem = Some(brief.problem.clone());
                project.questions = brief.questions.clone();
                project.refinement_iteration = brief.refinement_iteration;
                project.phase = PipelinePhase::Interview;
                project.transcript = Some(match project.transcript.take() {
                    Some(existing) => format!("{}\n\n{}", existing, transcript),
                    None => transcript.to_string(),
                });
                self.storage.update_project(&project)?;
                id.to_string()
            }
            None => {
                let id = generate_id("fp", &brief.title);
                let mut project = Project::new(id.clone(), brief.title.clone());
                project.summary = Some(brief.summary.clone());
                project.problem = Some(brief.problem.clone());
                project.questions = brief.questions.clone();
                project.transcript = Some(transcript.to_string());
                self.storage.create_project(&project)?;

                for (i, text) in GLOBAL_PHASES.iter().enumerate() {
                    self.storage.create_global_task(
                        &id,
                        &GlobalTask {
                            text: text.to_string(),
                            done: i == 0,
                            sort_order: i as i64,
                        },
                    )?;
                }
                id
            }
        };

        self.storage.delete_components(&id)?;
        self.storage.delete_edges(&id)?;
        for comp in &brief.components {
            self.storage.create_component(&id, comp)?;
        }
        for edge in &brief.edges {
            self.storage.create_edge(&id, edge)?;
        }

        Ok(id)
    }
}

/// Deterministic minimal brief used when the model response is unusable.
fn fallback_brief(description: &str) -> BriefDraft {
    BriefDraft {
        title: Some("New Project".to_string()),
        summary: Some(truncate(description, 500)),
        problem: Some("Extracted from user description".to_string()),
        goals: vec!["Complete the project as described".to_string()],
        components: vec![ComponentDraft {
            id: Some("comp_main".to_string()),
            label: Some("Main Component".to_string()),
            summary: Some("Primary implementation".to_string()),
            inputs: vec!["User Input".to_string()],
            outputs: vec!["Project Output".to_string()],
            ..Default::default()
        }],
        edges: Vec::new(),
        global_requirements: Vec::new(),
        global_risks: vec!["Requirements may need clarification".to_string()],
        questions: vec!["Could you provide more details about the project?".to_string()],
    }
}

fn format_questions(questions: &[String]) -> String {
    if questions.is_empty() {
        return String::new();
    }
    let list = questions
        .iter()
        .map(|q| format!("- {}", q))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Clarifying questions:\n{}", list)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
