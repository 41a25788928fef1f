//! Foreman - a planning pipeline for AI agents and humans.
//!
//! This library provides the core functionality for the `fm` CLI tool:
//! turning a free-text project description into a component dependency
//! graph, per-component build plans, and a validated build order, by
//! driving a rate-limited external model CLI.

pub mod action_log;
pub mod agents;
pub mod cli;
pub mod commands;
pub mod config;
pub mod executor;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod schedule;
pub mod storage;
pub mod throttle;


/// Library-level error type for Foreman operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `fm system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cycle detected in component dependencies")]
    CycleDetected,

    #[error("Model invocation failed: {0}")]
    Invoke(#[from] executor::InvokeError),

    #[error("Response extraction failed: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Foreman operations.
pub type Result<T> = std::result::Result<T, Error>;
