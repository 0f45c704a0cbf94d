//! Test-only helpers: scripted invokers, recording sinks, and fixtures.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::core::outcome::{ExecutionError, InvocationResult};
use crate::core::placeholder::DEFAULT_PLACEHOLDER;
use crate::core::request::{BuildFlags, InvocationRequest, RequestTemplate};
use crate::io::config::{IteratorConfig, write_config};
use crate::io::invoker::Invoker;
use crate::io::output::OutputSink;
use crate::iterate::IterationSettings;

/// Sink that keeps every line it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl OutputSink for RecordingSink {
    fn consume_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// One scripted response from [`ScriptedInvoker`].
#[derive(Debug, Clone)]
pub enum ScriptedInvocation {
    /// Build ran and exited with this result; `output` is sent to the sink first.
    Ran {
        result: InvocationResult,
        output: Vec<String>,
    },
    /// Build could not be launched.
    LaunchFailure(String),
}

impl ScriptedInvocation {
    pub fn ok() -> Self {
        Self::exit(0)
    }

    pub fn exit(code: i32) -> Self {
        Self::Ran {
            result: InvocationResult::exit(code),
            output: Vec::new(),
        }
    }

    pub fn exit_with_error(code: i32, message: &str, cause: Option<&str>) -> Self {
        Self::Ran {
            result: InvocationResult {
                exit_code: code,
                execution_error: Some(ExecutionError {
                    message: message.to_string(),
                    cause: cause.map(str::to_string),
                }),
            },
            output: Vec::new(),
        }
    }

    pub fn launch_failure(message: &str) -> Self {
        Self::LaunchFailure(message.to_string())
    }
}

/// Invoker that replays queued responses and records every request.
///
/// Once the queue is empty every further call succeeds.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    queue: RefCell<VecDeque<ScriptedInvocation>>,
    requests: RefCell<Vec<InvocationRequest>>,
}

impl ScriptedInvoker {
    pub fn new(responses: Vec<ScriptedInvocation>) -> Self {
        Self {
            queue: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<InvocationRequest> {
        self.requests.borrow().clone()
    }

    pub fn invoked_items(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.item.clone())
            .collect()
    }
}

impl Invoker for ScriptedInvoker {
    fn program(&self) -> &str {
        "mvn"
    }

    fn execute(
        &self,
        request: &InvocationRequest,
        sink: &dyn OutputSink,
    ) -> Result<InvocationResult> {
        self.requests.borrow_mut().push(request.clone());
        match self.queue.borrow_mut().pop_front() {
            None => Ok(InvocationResult::success()),
            Some(ScriptedInvocation::Ran { result, output }) => {
                for line in &output {
                    sink.consume_line(line);
                }
                Ok(result)
            }
            Some(ScriptedInvocation::LaunchFailure(message)) => Err(anyhow!(message)),
        }
    }
}

/// Request template with deterministic defaults rooted at `dir`.
pub fn request_template(dir: &Path) -> RequestTemplate {
    RequestTemplate {
        placeholder: DEFAULT_PLACEHOLDER.to_string(),
        working_directory: None,
        default_directory: dir.to_path_buf(),
        local_repository: Some(dir.join("repository")),
        pom_file: None,
        goals: vec!["verify".to_string()],
        profiles: Vec::new(),
        properties: BTreeMap::new(),
        flags: BuildFlags::default(),
    }
}

/// Settings iterating over an explicit item list.
pub fn settings_for_items(dir: &Path, items: &[&str]) -> IterationSettings {
    IterationSettings {
        items: items.iter().map(|i| i.to_string()).collect(),
        content: None,
        delimiter: crate::core::items::DEFAULT_DELIMITER.to_string(),
        template_vars: BTreeMap::new(),
        request: request_template(dir),
        skip: false,
    }
}

/// Settings iterating over a content block.
pub fn settings_for_content(dir: &Path, content: &str) -> IterationSettings {
    IterationSettings {
        items: Vec::new(),
        content: Some(content.to_string()),
        ..settings_for_items(dir, &[])
    }
}

#[derive(Debug, Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut inner) = self.0.lock() {
            inner.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged at info and above.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = buf
        .0
        .lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    (value, logs)
}

/// Temporary directory holding an `invoker.toml` and fake build tools.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("invoker.toml")
    }

    pub fn write_config(&self, cfg: &IteratorConfig) -> Result<()> {
        write_config(&self.config_path(), cfg)
    }

    /// Create `dir/<name>` subdirectories, e.g. one module per item.
    pub fn create_dirs(&self, names: &[&str]) -> Result<()> {
        for name in names {
            std::fs::create_dir_all(self.path().join(name))?;
        }
        Ok(())
    }

    /// Install an executable script standing in for the build tool.
    #[cfg(unix)]
    pub fn fake_build_tool(&self, body: &str) -> PathBuf {
        write_script(self.path(), "fake-mvn", body)
    }
}

/// Write an executable `sh` script into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}
