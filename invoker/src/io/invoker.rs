//! Invoker abstraction for build tool execution.
//!
//! The [`Invoker`] trait decouples iteration from the actual build tool
//! backend (currently `mvn`). Tests use scripted invokers that return
//! predetermined results without spawning processes.

use std::collections::BTreeMap;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::outcome::{ExecutionError, InvocationResult};
use crate::core::request::InvocationRequest;
use crate::io::output::OutputSink;
use crate::io::process::{StreamedExit, run_command_streaming};

/// Exit code recorded when the process ended without one (signal, kill).
pub const NO_EXIT_CODE: i32 = -1;

/// Abstraction over build tool execution backends.
pub trait Invoker {
    /// Program name shown in command lines.
    fn program(&self) -> &str;

    /// Run the build tool for one request, forwarding its output to `sink`.
    ///
    /// `Err` means the process could not be launched; a process that ran and
    /// failed is reported through [`InvocationResult`].
    fn execute(&self, request: &InvocationRequest, sink: &dyn OutputSink)
    -> Result<InvocationResult>;
}

/// Invoker that spawns a Maven-compatible executable.
#[derive(Debug, Clone)]
pub struct MavenInvoker {
    pub executable: String,
    pub timeout: Option<Duration>,
    /// Extra environment variables for every invocation (e.g. `MAVEN_OPTS`).
    pub env: BTreeMap<String, String>,
}

impl MavenInvoker {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            timeout: None,
            env: BTreeMap::new(),
        }
    }
}

impl Invoker for MavenInvoker {
    fn program(&self) -> &str {
        &self.executable
    }

    #[instrument(skip_all, fields(item = %request.item, timeout_secs = self.timeout.map(|t| t.as_secs())))]
    fn execute(
        &self,
        request: &InvocationRequest,
        sink: &dyn OutputSink,
    ) -> Result<InvocationResult> {
        info!(workdir = %request.working_directory.display(), "starting build");

        if !request.working_directory.is_dir() {
            bail!(
                "working directory {} does not exist",
                request.working_directory.display()
            );
        }

        let mut cmd = Command::new(&self.executable);
        cmd.args(request.to_args())
            .envs(&self.env)
            .current_dir(&request.working_directory);

        let exit = run_command_streaming(cmd, self.timeout, sink)
            .with_context(|| format!("launch {}", self.executable))?;

        let result = self.result_from_exit(&exit);
        debug!(exit_code = result.exit_code, "build finished");
        Ok(result)
    }
}

impl MavenInvoker {
    fn result_from_exit(&self, exit: &StreamedExit) -> InvocationResult {
        if exit.timed_out {
            warn!(timeout = ?self.timeout, "build timed out");
            return InvocationResult {
                exit_code: exit.status.code().unwrap_or(NO_EXIT_CODE),
                execution_error: Some(ExecutionError {
                    message: format!("{} timed out after {:?}", self.executable, self.timeout),
                    cause: Some("killed by invoker".to_string()),
                }),
            };
        }
        match exit.status.code() {
            Some(code) => InvocationResult::exit(code),
            None => InvocationResult {
                exit_code: NO_EXIT_CODE,
                execution_error: Some(ExecutionError {
                    message: format!("{} terminated without an exit code", self.executable),
                    cause: signal_cause(&exit.status),
                }),
            },
        }
    }
}

#[cfg(unix)]
fn signal_cause(status: &std::process::ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| format!("signal {signal}"))
}

#[cfg(not(unix))]
fn signal_cause(_status: &std::process::ExitStatus) -> Option<String> {
    None
}
