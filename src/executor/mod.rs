//! External model invocation.
//!
//! A single blocking call boundary: send a prompt (plus optional system
//! text and a json-mode flag), receive raw text or a typed failure.
//! The executable is resolved from the host's search path and runs
//! with ambient credential variables removed so it must use its own
//! local authentication.
//!
//! Retry behavior lives in `RetryPolicy` as data; logging is attached
//! by callers, not interleaved with the control flow here.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::throttle::CallThrottle;

/// Credential variables stripped from the child environment.
const CREDENTIAL_VARS: &[&str] = &["ANTHROPIC_API_KEY", "ANTHROPIC_AUTH_TOKEN"];

/// How much stderr to carry in a process failure.
const STDERR_SAMPLE_LEN: usize = 500;

/// Instruction appended to the system text when json_mode is set.
const JSON_INSTRUCTION: &str = "\n\nIMPORTANT: Respond with valid JSON only. \
No explanation, no markdown code blocks, just raw JSON.";

/// Typed failure from an external invocation.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The call exceeded the per-attempt ceiling on the final attempt.
    #[error("model CLI timed out after {0:?}")]
    Timeout(Duration),

    /// The process exited non-zero on the final attempt.
    #[error("model CLI failed: {stderr}")]
    Process { stderr: String },

    /// The executable is not on the search path. Permanent; never retried.
    #[error("model CLI executable not found: {0}")]
    NotFound(String),
}

impl InvokeError {
    /// Permanent failures abort the phase; everything else is absorbed
    /// by the call site's fallback.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InvokeError::NotFound(_))
    }
}

/// One invocation of the external service.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Append an explicit bare-JSON instruction to the system text.
    pub json_mode: bool,
    /// Total attempts allowed for this request; None uses the
    /// executor's configured default.
    pub max_retries: Option<usize>,
}

impl InvokeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            json_mode: false,
            max_retries: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn expect_json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Retry behavior as data.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Per-attempt ceiling
    pub timeout: Duration,
    /// Fixed pause between attempts
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            pause: Duration::from_secs(2),
        }
    }
}

/// Capability seam for issuing model calls.
///
/// Phases and the scheduler take an invoker by parameter so tests can
/// script responses without a live executable.
pub trait ModelInvoker {
    fn invoke(&self, request: &InvokeRequest) -> Result<String, InvokeError>;
}

/// Configuration for the CLI-backed invoker.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Executable name or path (resolved from the search path)
    pub program: String,
    /// Model flag passed to the executable, if any
    pub model: Option<String>,
    /// Default total attempts when a request does not specify its own
    pub max_retries: usize,
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            model: None,
            max_retries: 3,
            retry: RetryPolicy::default(),
        }
    }
}

/// Invoker backed by the external model CLI.
///
/// Every call consults the shared throttle first, sleeps out any
/// required wait on the calling thread, then spawns one attempt with a
/// bounded timeout. Timeouts and non-zero exits retry with a fixed
/// pause; a missing executable does not.
pub struct CliExecutor {
    config: ExecutorConfig,
    throttle: Arc<CallThrottle>,
}

impl CliExecutor {
    pub fn new(config: ExecutorConfig, throttle: Arc<CallThrottle>) -> Self {
        Self { config, throttle }
    }

    /// The shared throttle, for status inspection.
    pub fn throttle(&self) -> &CallThrottle {
        &self.throttle
    }

    /// Run one attempt to completion or timeout.
    fn run_attempt(&self, full_prompt: &str) -> Result<String, InvokeError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-p")
            .arg(full_prompt)
            .arg("--dangerously-skip-permissions");

        if let Some(model) = &self.config.model {
            cmd.arg("--model").arg(model);
        }

        // Force the CLI onto its own local auth.
        for var in CREDENTIAL_VARS {
            cmd.env_remove(var);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvokeError::NotFound(self.config.program.clone())
            } else {
                InvokeError::Process {
                    stderr: truncate(&e.to_string()),
                }
            }
        })?;

        let status = child
            .wait_timeout(self.config.retry.timeout)
            .map_err(|e| InvokeError::Process {
                stderr: truncate(&e.to_string()),
            })?;

        let Some(status) = status else {
            // Ceiling hit: kill the child and report a timeout.
            let _ = child.kill();
            let _ = child.wait();
            return Err(InvokeError::Timeout(self.config.retry.timeout));
        };

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            let _ = out.read_to_string(&mut stdout);
        }

        if status.success() {
            Ok(stdout)
        } else {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            Err(InvokeError::Process {
                stderr: truncate(&stderr),
            })
        }
    }
}

impl ModelInvoker for CliExecutor {
    fn invoke(&self, request: &InvokeRequest) -> Result<String, InvokeError> {
        let mut system = request.system.clone();
        if request.json_mode {
            match &mut system {
                Some(s) => s.push_str(JSON_INSTRUCTION),
                None => system = Some(JSON_INSTRUCTION.trim_start().to_string()),
            }
        }

        let full_prompt = match &system {
            Some(s) => format!("System: {}\n\nUser: {}", s, request.prompt),
            None => request.prompt.clone(),
        };

        let attempts = request.max_retries.unwrap_or(self.config.max_retries).max(1);
        let mut last_err = None;

        for attempt in 0..attempts {
            // Sleep out any throttle debt before issuing the attempt.
            let wait = self.throttle.wait_time();
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }

            match self.run_attempt(&full_prompt) {
                Ok(output) => {
                    self.throttle.record_call();
                    return Ok(output);
                }
                Err(err @ InvokeError::NotFound(_)) => return Err(err),
                Err(err) => {
                    last_err = Some(err);
                    if attempt + 1 < attempts {
                        std::thread::sleep(self.config.retry.pause);
                    }
                }
            }
        }

        Err(last_err.expect("at least one attempt was made"))
    }
}

/// Scripted invoker for tests: returns queued responses in order.
#[cfg(test)]
pub(crate) mod testing {
    use super::{InvokeError, InvokeRequest, ModelInvoker};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct ScriptedInvoker {
        responses: Mutex<VecDeque<Result<String, InvokeError>>>,
        default: Option<String>,
        pub calls: Mutex<Vec<InvokeRequest>>,
    }

    impl ScriptedInvoker {
        pub fn new(responses: Vec<Result<String, InvokeError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                default: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Every call answered with the same text.
        pub fn always(text: &str) -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                default: Some(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ModelInvoker for ScriptedInvoker {
        fn invoke(&self, request: &InvokeRequest) -> Result<String, InvokeError> {
            self.calls.lock().unwrap().push(request.clone());
            match self.responses.lock().unwrap().pop_front() {
                Some(response) => response,
                None => match &self.default {
                    Some(text) => Ok(text.clone()),
                    None => Err(InvokeError::Process {
                        stderr: "script exhausted".to_string(),
                    }),
                },
            }
        }
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.len() <= STDERR_SAMPLE_LEN {
        return text.to_string();
    }
    let mut end = STDERR_SAMPLE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
