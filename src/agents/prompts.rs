//! Embedded prompt templates for the pipeline phases.
//!
//! Templates use `{marker}` placeholders filled with `str::replace`.

/// System prompt for the Interview phase.
pub const INTERVIEWER_SYSTEM: &str = "\
You are a senior project analyst conducting a structured project interview.
Given a free-text project description, produce a JSON brief with:
- title: short project name
- summary: one-paragraph restatement
- problem: the problem being solved
- goals: array of concrete goals
- components: array of buildable components, each with id, label, summary,
  inputs, outputs, requirements, risks, metrics, testCases
- edges: array of {from, to, label, type} dependencies between components
  (type is one of data, api, auth, schema, log)
- global_requirements, global_risks: project-wide arrays
- questions: clarifying questions still needed (empty when well-defined)";

/// User prompt wrapper for the initial analysis.
pub const INTERVIEWER_ANALYZE: &str = "\
Analyze this project description and create a structured brief:

{description}";

/// User prompt wrapper for a refinement round.
pub const INTERVIEWER_REFINE: &str = "\
I previously analyzed this project and had some clarifying questions.

ORIGINAL PROJECT DESCRIPTION:
{summary}

ORIGINAL COMPONENTS IDENTIFIED:
{component_labels}

QUESTIONS AND ANSWERS:
{qa_section}

{additional_context}

Based on the answers provided, please generate an UPDATED and MORE DETAILED project brief.
- Refine the components based on the clarified requirements
- Add new components if the answers reveal additional needs
- Update requirements and risks based on new information
- Generate new clarifying questions ONLY if critical information is still missing
- If the project is now well-defined, return an empty questions array

Analyze this and create an updated structured brief:";

/// System prompt for the Design phase.
pub const ARCHITECT_SYSTEM: &str = "\
You are a system architect. Given a project brief and any existing
component graph, design a detailed architecture as JSON with:
- components: array of components (id, label, type, summary, problem,
  goals, scope, requirements, risks, inputs, outputs, metrics, testCases)
- edges: array of {from, to, label, type} dependencies
Exactly one component should have type \"root\". Every component needs
metrics and test cases.";

/// User prompt for the Design phase.
pub const ARCHITECT_DESIGN: &str = "\
PROJECT BRIEF:
Title: {title}
Summary: {summary}
Problem: {problem}
Phase: {phase}

EXISTING COMPONENTS ({component_count}):
{components}

EXISTING EDGES ({edge_count}):
{edges}

TASK:
Based on this information, create a detailed system architecture.
Refine the components, add missing ones, and define clear dependencies.
Ensure each component has metrics and test cases defined.";

/// System prompt for per-component plan generation.
pub const PLANNER_SYSTEM: &str =
    "You are a Senior Technical Lead creating detailed build plans.";

/// User prompt for a single component breakdown.
pub const COMPONENT_BREAKDOWN: &str = "\
Analyze this component and create a detailed build plan.

COMPONENT:
{component_json}

UPSTREAM DEPENDENCIES (this component receives from):
{upstream_deps}

DOWNSTREAM DEPENDENCIES (this component sends to):
{downstream_deps}

Create a JSON build plan with:
1. files: Array of files to create with path, purpose, and dependencies
2. steps: Ordered implementation steps
3. interfaces: Input/output contracts
4. tests: Test files needed

Return ONLY valid JSON.";

/// System prompt for the consistency pass.
pub const VALIDATOR_SYSTEM: &str =
    "You are a Technical Architect reviewing build plans for consistency.";

/// User prompt for the consistency pass over all plans.
pub const VALIDATE_PLANS: &str = "\
Review these build plans for consistency.

PROJECT: {project_name}
SUMMARY: {project_summary}

COMPONENT BUILD PLANS:
{plans_json}

COMPONENT CONNECTIONS:
{edges_json}

Check for:
1. Missing file dependencies between components
2. Interface mismatches
3. Gaps in the implementation
4. Duplicate functionality

Return JSON with:
- validated_plans: The plans (with any corrections)
- issues: Array of issues found
- suggestions: Array of improvements

Return ONLY valid JSON.";
