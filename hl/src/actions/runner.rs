//! Run extracted code in a subprocess

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::ActionError;
use crate::config::RunnerConfig;

/// Captured result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal
    pub exit_status: Option<i32>,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Executes code by writing it to a temp file and invoking an interpreter
#[derive(Debug, Clone)]
pub struct CodeRunner {
    interpreter: String,
    timeout: Duration,
}

impl Default for CodeRunner {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

impl CodeRunner {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.interpreter.clone(), Duration::from_millis(config.timeout_ms))
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run `code` and capture its output
    ///
    /// The temp file is removed when this returns. A non-zero exit is a
    /// normal [`RunOutput`], not an error.
    pub async fn execute(&self, code: &str) -> Result<RunOutput, ActionError> {
        debug!(code_len = code.len(), interpreter = %self.interpreter, "CodeRunner::execute: called");

        let mut script = tempfile::Builder::new().prefix("hitloop-").suffix(".py").tempfile()?;
        script.write_all(code.as_bytes())?;
        script.flush()?;
        debug!(path = ?script.path(), "CodeRunner::execute: script written");

        let mut command = tokio::process::Command::new(&self.interpreter);
        command.arg(script.path()).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                debug!(%source, "CodeRunner::execute: spawn failed");
                return Err(ActionError::Spawn {
                    interpreter: self.interpreter.clone(),
                    source,
                });
            }
            Err(_) => {
                debug!("CodeRunner::execute: timed out");
                return Err(ActionError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        let result = RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: output.status.code(),
        };
        info!(exit_status = ?result.exit_status, stdout_len = result.stdout.len(), "Code run finished");
        Ok(result)
    }
}
