//! Machine-readable run reports (`invoker run --report <path>`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::outcome::RunReport;

/// Write the report as pretty JSON with a trailing newline.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(report).context("serialize run report")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

pub fn load_report(path: &Path) -> Result<RunReport> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::{ExecutionError, ItemOutcome, ItemReport};

    #[test]
    fn writes_report_into_missing_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reports/run.json");
        let report = RunReport {
            skipped: false,
            items: vec![ItemReport {
                index: 0,
                item: "v1".to_string(),
                command_line: "mvn verify".to_string(),
                outcome: ItemOutcome::NonZeroExit {
                    exit_code: -1,
                    execution_error: Some(ExecutionError {
                        message: "mvn timed out".to_string(),
                        cause: None,
                    }),
                },
                duration_ms: 12,
            }],
        };

        write_report(&path, &report).expect("write");
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.ends_with('\n'));
        assert!(raw.contains("\"status\": \"non_zero_exit\""));
        assert_eq!(load_report(&path).expect("load"), report);
    }
}
