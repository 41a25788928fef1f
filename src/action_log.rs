//! Action logging for Foreman commands.
//!
//! Every CLI invocation is appended to a JSONL log file in the
//! workspace's data directory. Logging never fails a command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::storage;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Workspace path where the command was executed
    pub workspace: String,

    /// Command name (e.g., "interview", "design", "graph export")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,
}

/// Log an action to the workspace's action log.
///
/// This function never fails - it falls back to stderr warnings so a
/// logging issue cannot break the command itself.
pub fn log_action(
    workspace: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let log_path = match get_log_path(workspace) {
        Some(path) => path,
        None => return,
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        workspace: workspace.to_string_lossy().to_string(),
        command: command.to_string(),
        args,
        success,
        error,
        duration_ms,
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }
}

/// The action log lives next to the database.
fn get_log_path(workspace: &Path) -> Option<PathBuf> {
    let root = storage::get_storage_dir(workspace).ok()?;
    if !root.exists() {
        return None;
    }
    Some(root.join("action.log"))
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    let line = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}
