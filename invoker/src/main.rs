//! Item-iterating build invoker.
//!
//! Reads `invoker.toml`, resolves the item list and runs the build tool once
//! per item with the placeholder substituted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use invoker::core::items::ConfigurationError;
use invoker::exit_codes;
use invoker::io::config::{
    DEFAULT_CONFIG_FILE, IteratorConfig, config_base_dir, load_config, write_config,
};
use invoker::io::output::LogOutputSink;
use invoker::io::report::write_report;
use invoker::iterate::{IterationSettings, run_iterations};
use invoker::logging;

#[derive(Parser)]
#[command(
    name = "invoker",
    version,
    about = "Run a build tool once per item with a placeholder substituted"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Check the configuration and resolve the item list.
    Validate,
    /// Print the resolved items, one per line.
    Items,
    /// Run the build once per item.
    Run {
        /// Iterate over these items instead of the configured source.
        #[arg(long = "item", value_name = "ITEM")]
        items: Vec<String>,
        /// Exit with a failure code if any item failed.
        #[arg(long)]
        fail_at_end: bool,
        /// Write a JSON report of every item's outcome.
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            if let Some(config_err) = err.downcast_ref::<ConfigurationError>() {
                eprintln!("configuration error: {config_err}");
            } else {
                eprintln!("{:#}", err);
            }
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Validate => cmd_validate(&cli.config),
        Command::Items => cmd_items(&cli.config),
        Command::Run {
            items,
            fail_at_end,
            report,
        } => cmd_run(&cli.config, items, fail_at_end, report.as_deref()),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if !force && config_path.exists() {
        println!("exists: {}", config_path.display());
        return Ok(exit_codes::OK);
    }
    let cfg = IteratorConfig {
        items: vec!["example".to_string()],
        ..IteratorConfig::default()
    };
    write_config(config_path, &cfg).context("write starter config")?;
    println!("wrote: {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(config_path: &Path) -> Result<i32> {
    let (_, settings) = load_settings(config_path)?;
    let items = settings.resolve_items()?;
    println!("ok: {} items", items.len());
    Ok(exit_codes::OK)
}

fn cmd_items(config_path: &Path) -> Result<i32> {
    let (_, settings) = load_settings(config_path)?;
    for item in settings.resolve_items()? {
        println!("{item}");
    }
    Ok(exit_codes::OK)
}

fn cmd_run(
    config_path: &Path,
    items: Vec<String>,
    fail_at_end: bool,
    report_path: Option<&Path>,
) -> Result<i32> {
    let (cfg, mut settings) = load_settings(config_path)?;
    if !items.is_empty() {
        settings.items = items;
        settings.content = None;
    }
    if cfg.threads.is_some_and(|threads| threads > 1) {
        warn!(threads = cfg.threads, "threads is reserved; items run one at a time");
    }

    let invoker = cfg.to_invoker();
    let report = run_iterations(&settings, &invoker, &LogOutputSink, |_| {})?;

    if let Some(path) = report_path {
        write_report(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    let failed: Vec<&str> = report.failures().map(|r| r.item.as_str()).collect();
    println!(
        "run: items={} failed={}",
        report.items.len(),
        failed.len()
    );
    for item in &failed {
        println!("failed: {item}");
    }

    if !failed.is_empty() && (fail_at_end || cfg.fail_at_end) {
        return Ok(exit_codes::ITEM_FAILED);
    }
    Ok(exit_codes::OK)
}

fn load_settings(config_path: &Path) -> Result<(IteratorConfig, IterationSettings)> {
    let cfg = load_config(config_path).context("load config")?;
    let settings = cfg.to_settings(&config_base_dir(config_path), template_vars());
    Ok((cfg, settings))
}

/// Process environment exposed to content templates as `env`.
///
/// Variables whose name or value is not valid UTF-8 are left out.
fn template_vars() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                debug!(
                    key = %key.unwrap_or_else(|k| k.to_string_lossy().into_owned()),
                    "skipping non-UTF-8 environment variable"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_items() {
        let cli = Cli::parse_from([
            "invoker",
            "run",
            "--item",
            "a",
            "--item",
            "b",
            "--fail-at-end",
        ]);
        match cli.command {
            Command::Run {
                items,
                fail_at_end,
                report,
            } => {
                assert_eq!(items, vec!["a", "b"]);
                assert!(fail_at_end);
                assert!(report.is_none());
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["invoker", "validate", "--config", "ci/invoker.toml"]);
        assert!(matches!(cli.command, Command::Validate));
        assert_eq!(cli.config, PathBuf::from("ci/invoker.toml"));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["invoker", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }
}
