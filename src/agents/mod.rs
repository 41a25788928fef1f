//! Pipeline phase drivers.
//!
//! Each phase (Interview, Design, Plan) is driven by an agent that
//! takes its collaborators (model invoker and storage) as constructor
//! parameters. The `PhaseAgent` trait carries the capability hooks all
//! agents share; `execute` stays an inherent method because every
//! phase's signature differs.

pub mod architect;
pub mod interviewer;
pub mod planner;
pub mod prompts;

use serde::Serialize;

use crate::models::{AgentRecord, AgentStatus, Dept, LogEntry, LogLevel};
use crate::storage::Storage;

/// What an agent is allowed to see, for audit and prompt scoping.
#[derive(Debug, Clone, Serialize)]
pub struct ScopedContext {
    pub role: &'static str,
    pub access: Vec<&'static str>,
    pub restrictions: Vec<&'static str>,
}

/// Capability contract shared by every phase driver.
pub trait PhaseAgent {
    /// Unique id of this agent instance (e.g., "architect_a1b2c3d4").
    fn agent_id(&self) -> &str;

    fn display_name(&self) -> &'static str;

    fn dept(&self) -> Dept;

    fn initials(&self) -> &'static str;

    /// The context this agent may see. Each phase defines its own
    /// scope so no agent reads state outside it.
    fn scoped_context(&self) -> ScopedContext;
}

/// Mint an agent instance id: `<kind>_<8 hex chars>`.
pub(crate) fn new_agent_id(kind: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", kind, &hex[..8])
}

/// Write a log row; logging failures never break the agent.
pub(crate) fn log(
    storage: &Storage,
    agent_id: &str,
    project_id: Option<&str>,
    action: &str,
    message: &str,
    level: LogLevel,
) {
    let entry = LogEntry {
        project_id: project_id.map(String::from),
        component_id: None,
        agent_id: Some(agent_id.to_string()),
        action: action.to_string(),
        message: message.to_string(),
        level,
        timestamp: chrono::Utc::now(),
    };
    if storage.create_log(&entry).is_err() {
        eprintln!("[{}] {}: {}", agent_id, action, message);
    }
}

/// Record an agent instance as complete.
pub(crate) fn record_complete<A: PhaseAgent>(storage: &Storage, agent: &A) {
    let record = AgentRecord {
        id: agent.agent_id().to_string(),
        name: agent.display_name().to_string(),
        dept: agent.dept(),
        initials: agent.initials().to_string(),
        status: AgentStatus::Complete,
    };
    // Bookkeeping only; a failed insert is not worth failing the phase.
    let _ = storage.create_agent(&record);
}
