//! Forwarding of build tool output lines.

use tracing::info;

/// Receives subprocess output one line at a time.
pub trait OutputSink {
    fn consume_line(&self, line: &str);
}

/// Sink that forwards each line to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutputSink;

impl OutputSink for LogOutputSink {
    fn consume_line(&self, line: &str) {
        info!(target: "invoker::build", "{line}");
    }
}

/// Strip the line terminator and decode lossily.
pub fn normalize_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;

    #[test]
    fn log_sink_emits_info_under_build_target() {
        let ((), logs) = capture_logs(|| LogOutputSink.consume_line("[INFO] BUILD SUCCESS"));
        let line = logs
            .lines()
            .find(|l| l.contains("[INFO] BUILD SUCCESS"))
            .expect("build line logged");
        assert!(line.contains("INFO"));
        assert!(line.contains("invoker::build"));
    }

    #[test]
    fn strips_line_endings() {
        assert_eq!(normalize_line(b"[INFO] BUILD SUCCESS\r\n"), "[INFO] BUILD SUCCESS");
        assert_eq!(normalize_line(b"no newline"), "no newline");
        assert_eq!(normalize_line(b"\n"), "");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(normalize_line(b"caf\xff\n"), "caf\u{fffd}");
    }
}
