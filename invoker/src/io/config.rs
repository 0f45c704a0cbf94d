//! Invoker configuration stored in `invoker.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::items::DEFAULT_DELIMITER;
use crate::core::placeholder::DEFAULT_PLACEHOLDER;
use crate::core::request::{BuildFlags, RequestTemplate};
use crate::io::invoker::MavenInvoker;
use crate::iterate::IterationSettings;

pub const DEFAULT_CONFIG_FILE: &str = "invoker.toml";

/// Iteration configuration (TOML).
///
/// Exactly one of `items` and `content` must be set; that rule is checked when
/// a run starts rather than here, so `validate` accepts either state. Missing
/// fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IteratorConfig {
    /// Explicit items, iterated in order.
    pub items: Vec<String>,

    /// Template rendered with `env` in scope, then split on `delimiter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    pub delimiter: String,

    /// Token replaced by the current item.
    pub placeholder: String,

    /// Per-item working directory; may contain the placeholder.
    /// Relative paths resolve against the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,

    /// Local repository passed to every build. Defaults to `~/.m2/repository`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<PathBuf>,

    /// Reserved. Items always run one at a time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,

    /// Skip the whole run.
    pub skip: bool,

    /// Report failure (exit code 2) once all items ran if any of them failed.
    pub fail_at_end: bool,

    pub invoker: InvokerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InvokerConfig {
    /// Build tool executable (e.g. `mvn`, `./mvnw`).
    pub executable: String,
    pub goals: Vec<String>,
    pub profiles: Vec<String>,
    /// POM passed with `-f`; may contain the placeholder.
    /// Relative paths resolve against the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pom_file: Option<PathBuf>,
    pub offline: bool,
    pub batch_mode: bool,
    pub debug: bool,
    pub show_errors: bool,
    pub update_snapshots: bool,
    pub quiet: bool,
    /// Kill a build after this many seconds. Unset waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// `-Dkey=value` properties; values may contain the placeholder.
    pub properties: BTreeMap<String, String>,
    /// Extra environment for the build process (e.g. `MAVEN_OPTS`).
    pub env: BTreeMap<String, String>,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            executable: "mvn".to_string(),
            goals: vec!["verify".to_string()],
            profiles: Vec::new(),
            pom_file: None,
            offline: false,
            batch_mode: false,
            debug: false,
            show_errors: false,
            update_snapshots: false,
            quiet: false,
            timeout_secs: None,
            properties: BTreeMap::new(),
            env: BTreeMap::new(),
        }
    }
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            content: None,
            delimiter: DEFAULT_DELIMITER.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            working_directory: None,
            local_repository: None,
            threads: None,
            skip: false,
            fail_at_end: false,
            invoker: InvokerConfig::default(),
        }
    }
}

impl IteratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.placeholder.is_empty() {
            return Err(anyhow!("placeholder must not be empty"));
        }
        if self.delimiter.is_empty() {
            return Err(anyhow!("delimiter must not be empty"));
        }
        if self.threads == Some(0) {
            return Err(anyhow!("threads must be > 0"));
        }
        if self.invoker.executable.trim().is_empty() {
            return Err(anyhow!("invoker.executable must not be empty"));
        }
        if self.invoker.timeout_secs == Some(0) {
            return Err(anyhow!("invoker.timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Build iteration settings, resolving relative paths against `base_dir`.
    ///
    /// The local repository is resolved here, once per run.
    pub fn to_settings(
        &self,
        base_dir: &Path,
        template_vars: BTreeMap<String, String>,
    ) -> IterationSettings {
        let local_repository = self
            .local_repository
            .as_ref()
            .map(|path| resolve_relative(base_dir, path))
            .or_else(default_local_repository);

        IterationSettings {
            items: self.items.clone(),
            content: self.content.clone(),
            delimiter: self.delimiter.clone(),
            template_vars,
            request: RequestTemplate {
                placeholder: self.placeholder.clone(),
                working_directory: self
                    .working_directory
                    .as_ref()
                    .map(|path| resolve_relative(base_dir, path)),
                default_directory: base_dir.to_path_buf(),
                local_repository,
                pom_file: self
                    .invoker
                    .pom_file
                    .as_ref()
                    .map(|path| resolve_relative(base_dir, path)),
                goals: self.invoker.goals.clone(),
                profiles: self.invoker.profiles.clone(),
                properties: self.invoker.properties.clone(),
                flags: BuildFlags {
                    offline: self.invoker.offline,
                    batch_mode: self.invoker.batch_mode,
                    debug: self.invoker.debug,
                    show_errors: self.invoker.show_errors,
                    update_snapshots: self.invoker.update_snapshots,
                    quiet: self.invoker.quiet,
                },
            },
            skip: self.skip,
        }
    }

    pub fn to_invoker(&self) -> MavenInvoker {
        MavenInvoker {
            executable: self.invoker.executable.clone(),
            timeout: self.invoker.timeout_secs.map(Duration::from_secs),
            env: self.invoker.env.clone(),
        }
    }
}

/// Directory relative config paths resolve against.
pub fn config_base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn default_local_repository() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".m2").join("repository"))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `IteratorConfig::default()`.
pub fn load_config(path: &Path) -> Result<IteratorConfig> {
    if !path.exists() {
        let cfg = IteratorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: IteratorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &IteratorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = config_base_dir(path);
    fs::create_dir_all(&parent)
        .with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
