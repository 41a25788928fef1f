//! Configuration for Foreman.
//!
//! User preferences live in `config.kdl` at the workspace data
//! directory:
//!
//! ```kdl
//! executable "claude"
//! model "claude-sonnet-4-5"
//! timeout-secs 180
//! max-retries 3
//! calls-per-minute 50
//! calls-per-hour 1000
//! output-format "human"  // or "json"
//! ```
//!
//! Precedence for the executable: `FM_CLI_BIN` env var > config file >
//! default. A missing config file is not an error.

use kdl::KdlDocument;
use std::path::Path;
use std::time::Duration;

use crate::executor::{ExecutorConfig, RetryPolicy};
use crate::throttle::ThrottleConfig;
use crate::{Error, Result};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }
}

/// User preferences parsed from config.kdl.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForemanConfig {
    /// Model CLI executable name or path
    pub executable: Option<String>,

    /// Model flag passed to the executable
    pub model: Option<String>,

    /// Per-attempt ceiling in seconds
    pub timeout_secs: Option<u64>,

    /// Total attempts per invocation
    pub max_retries: Option<usize>,

    pub calls_per_minute: Option<usize>,
    pub calls_per_hour: Option<usize>,

    pub output_format: Option<OutputFormat>,
}

impl ForemanConfig {
    /// Load from the config file in the given storage root. A missing
    /// file yields the defaults.
    pub fn load(storage_root: &Path) -> Result<Self> {
        let path = storage_root.join("config.kdl");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let doc: KdlDocument = text
            .parse()
            .map_err(|e| Error::Other(format!("Invalid config.kdl: {}", e)))?;
        Ok(Self::from_kdl(&doc))
    }

    /// Parse preferences from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::default();

        for node in doc.nodes() {
            let first_string = || {
                node.entries()
                    .first()
                    .and_then(|e| e.value().as_string())
                    .map(|s| s.to_string())
            };
            let first_integer = || {
                node.entries()
                    .first()
                    .and_then(|e| e.value().as_integer())
            };

            match node.name().to_string().as_str() {
                "executable" => config.executable = first_string(),
                "model" => config.model = first_string(),
                "timeout-secs" => {
                    config.timeout_secs = first_integer().map(|v| v.max(1) as u64);
                }
                "max-retries" => {
                    config.max_retries = first_integer().map(|v| v.max(1) as usize);
                }
                "calls-per-minute" => {
                    config.calls_per_minute = first_integer().map(|v| v.max(1) as usize);
                }
                "calls-per-hour" => {
                    config.calls_per_hour = first_integer().map(|v| v.max(1) as usize);
                }
                "output-format" => {
                    config.output_format = first_string().and_then(|s| OutputFormat::parse(&s));
                }
                _ => {}
            }
        }

        config
    }

    /// Resolve the executor configuration with env-var precedence.
    pub fn executor_config(&self) -> ExecutorConfig {
        let program = std::env::var("FM_CLI_BIN")
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.executable.clone())
            .unwrap_or_else(|| "claude".to_string());

        ExecutorConfig {
            program,
            model: self.model.clone(),
            max_retries: self.max_retries.unwrap_or(3),
            retry: RetryPolicy {
                timeout: Duration::from_secs(self.timeout_secs.unwrap_or(180)),
                pause: Duration::from_secs(2),
            },
        }
    }

    /// Resolve the throttle configuration.
    pub fn throttle_config(&self) -> ThrottleConfig {
        let defaults = ThrottleConfig::default();
        ThrottleConfig {
            calls_per_minute: self.calls_per_minute.unwrap_or(defaults.calls_per_minute),
            calls_per_hour: self.calls_per_hour.unwrap_or(defaults.calls_per_hour),
        }
    }
}
