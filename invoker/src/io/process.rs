//! Helpers for running child processes while streaming their output.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::output::{OutputSink, normalize_line};

/// How a streamed child process ended.
#[derive(Debug)]
pub struct StreamedExit {
    pub status: ExitStatus,
    pub timed_out: bool,
    pub lines: usize,
}

/// Run a command, forwarding each stdout/stderr line to `sink` as it arrives.
///
/// Reader threads drain both pipes and hand lines to the calling thread over a
/// channel, so the sink is only ever called from here. With `timeout` set the
/// child is killed once the deadline passes; without it this waits for as long
/// as the child runs.
///
/// Errors only when the child cannot be spawned or waited on. Failures reading
/// output are logged and do not hide the exit status.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs())))]
pub fn run_command_streaming(
    mut cmd: Command,
    timeout: Option<Duration>,
    sink: &dyn OutputSink,
) -> Result<StreamedExit> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel();
    let stdout_handle = spawn_line_reader(stdout, tx.clone());
    let stderr_handle = spawn_line_reader(stderr, tx);

    let deadline = timeout.map(|t| Instant::now() + t);
    let mut lines = 0usize;
    let mut timed_out = false;
    loop {
        let received = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        };
        match received {
            Ok(line) => {
                lines += 1;
                sink.consume_line(&normalize_line(&line));
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
        }
    }

    let status = match (timed_out, deadline) {
        (true, _) => kill_and_wait(&mut child)?,
        (false, None) => child.wait().context("wait for command")?,
        (false, Some(deadline)) => {
            match child
                .wait_timeout(deadline.saturating_duration_since(Instant::now()))
                .context("wait for command")?
            {
                Some(status) => status,
                None => {
                    timed_out = true;
                    kill_and_wait(&mut child)?
                }
            }
        }
    };

    // After a kill, readers may still be blocked on pipes held open by
    // grandchildren, so they are left detached.
    if timed_out {
        warn!(
            timeout_secs = timeout.map(|t| t.as_secs()),
            "command timed out, killed"
        );
    } else {
        finish_reader(stdout_handle, "stdout");
        finish_reader(stderr_handle, "stderr");
    }

    debug!(exit_code = ?status.code(), timed_out, lines, "command finished");
    Ok(StreamedExit {
        status,
        timed_out,
        lines,
    })
}

fn kill_and_wait(child: &mut Child) -> Result<ExitStatus> {
    child.kill().context("kill command")?;
    child.wait().context("wait command after kill")
}

fn spawn_line_reader<R: Read + Send + 'static>(
    reader: R,
    tx: Sender<Vec<u8>>,
) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || {
        let mut buf_reader = BufReader::new(reader);
        loop {
            let mut line = Vec::new();
            let n = buf_reader
                .read_until(b'\n', &mut line)
                .context("read line")?;
            if n == 0 || tx.send(line).is_err() {
                return Ok(());
            }
        }
    })
}

/// Join a reader once the child has exited. The exit status is already known,
/// so a failed reader only loses output.
fn finish_reader(handle: thread::JoinHandle<Result<()>>, stream: &str) {
    let result = match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    };
    if let Err(err) = result {
        warn!(stream, err = %format!("{err:#}"), "lost command output");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, capture_logs};

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn forwards_stdout_and_stderr_lines() {
        let sink = RecordingSink::default();
        let exit = run_command_streaming(
            sh("echo one; echo two >&2; printf three"),
            None,
            &sink,
        )
        .expect("run");

        assert!(exit.status.success());
        assert!(!exit.timed_out);
        assert_eq!(exit.lines, 3);
        let mut lines = sink.lines();
        lines.sort();
        assert_eq!(lines, vec!["one", "three", "two"]);
    }

    #[test]
    fn reports_exit_code() {
        let sink = RecordingSink::default();
        let exit = run_command_streaming(sh("exit 3"), None, &sink).expect("run");
        assert_eq!(exit.status.code(), Some(3));
    }

    #[test]
    fn kills_child_after_timeout() {
        let sink = RecordingSink::default();
        let exit = run_command_streaming(
            sh("exec sleep 5"),
            Some(Duration::from_millis(100)),
            &sink,
        )
        .expect("run");
        assert!(exit.timed_out);
        assert!(!exit.status.success());
    }

    #[test]
    fn failed_reader_is_logged_not_raised() {
        let handle = thread::spawn(|| Err(anyhow!("broken pipe")));
        let ((), logs) = capture_logs(|| finish_reader(handle, "stdout"));
        assert!(logs.contains("WARN"));
        assert!(logs.contains("lost command output"));
        assert!(logs.contains("broken pipe"));
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let sink = RecordingSink::default();
        let err = run_command_streaming(
            Command::new("definitely-not-a-real-binary-7f3a"),
            None,
            &sink,
        )
        .unwrap_err();
        assert!(err.to_string().contains("spawn command"));
    }
}
