//! Iteration controller for `invoker run`.
//!
//! Validates the item source, then runs the build once per item in order.
//! Per-item failures (launch failures, non-zero exits) are logged and recorded
//! in the [`RunReport`]; they never stop the loop. Only a
//! [`ConfigurationError`] fails the run, and it does so before any build runs.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, error, info, info_span, warn};

use crate::core::items::{ConfigurationError, ItemSource};
use crate::core::outcome::{ItemOutcome, ItemReport, RunReport};
use crate::core::request::{RequestTemplate, build_request};
use crate::io::invoker::Invoker;
use crate::io::output::OutputSink;

/// Everything a run needs, decoupled from how it was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationSettings {
    pub items: Vec<String>,
    pub content: Option<String>,
    pub delimiter: String,
    /// Exposed to `content` templates as `env`.
    pub template_vars: BTreeMap<String, String>,
    pub request: RequestTemplate,
    pub skip: bool,
}

impl IterationSettings {
    /// Resolve the ordered item list, enforcing that exactly one source is set.
    pub fn resolve_items(&self) -> Result<Vec<String>, ConfigurationError> {
        ItemSource::from_config(&self.items, self.content.as_deref())?
            .items(&self.delimiter, &self.template_vars)
    }
}

/// Run the build once per item.
///
/// Returns `Err` only for a [`ConfigurationError`] (downcastable from the
/// returned error), in which case no build was attempted. `on_item` is called
/// after each item with its report.
pub fn run_iterations<I: Invoker, F: FnMut(&ItemReport)>(
    settings: &IterationSettings,
    invoker: &I,
    sink: &dyn OutputSink,
    mut on_item: F,
) -> Result<RunReport> {
    if settings.skip {
        info!("skipping iteration");
        return Ok(RunReport {
            skipped: true,
            items: Vec::new(),
        });
    }

    let items = settings.resolve_items()?;
    debug!(count = items.len(), "resolved items");

    let mut report = RunReport::default();
    for (index, item) in items.iter().enumerate() {
        let item_report = run_item(&settings.request, invoker, sink, index, item);
        on_item(&item_report);
        report.items.push(item_report);
    }

    let failed = report.failures().count();
    if failed > 0 {
        warn!(items = report.items.len(), failed, "iteration finished with failures");
    } else {
        info!(items = report.items.len(), "iteration finished");
    }
    Ok(report)
}

fn run_item<I: Invoker>(
    template: &RequestTemplate,
    invoker: &I,
    sink: &dyn OutputSink,
    index: usize,
    item: &str,
) -> ItemReport {
    let span = info_span!("item", item, index);
    let _guard = span.enter();

    let request = build_request(template, item);
    let command_line = request.command_line(invoker.program());
    info!("{command_line}");

    let started = Instant::now();
    let outcome = match invoker.execute(&request, sink) {
        Ok(result) => ItemOutcome::from_result(result),
        Err(err) => ItemOutcome::LaunchFailure {
            message: format!("{err:#}"),
        },
    };
    log_outcome(&outcome);

    ItemReport {
        index,
        item: item.to_string(),
        command_line,
        outcome,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn log_outcome(outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Success => info!("build call ok"),
        ItemOutcome::NonZeroExit {
            exit_code,
            execution_error,
        } => {
            error!(exit_code, "build call was NOT ok ({exit_code})");
            match execution_error {
                Some(err) => error!(cause = ?err.cause, "{}", err.message),
                None => error!("No exception"),
            }
        }
        ItemOutcome::LaunchFailure { message } => {
            error!(err = %message, "failure during build call");
        }
    }
}
