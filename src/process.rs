//! Running external tools with a timeout and cancellation.
//!
//! stderr is drained on its own thread so a chatty tool can never block on a
//! full pipe while we poll for its exit.

use std::io::{ErrorKind, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::progress::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How an external tool invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ToolOutcome {
    Success,
    Failed { code: Option<i32>, stderr: String },
    NotFound,
    TimedOut,
    Cancelled,
    SpawnFailed(String),
}

impl ToolOutcome {
    /// Short description for logs and error messages.
    pub(crate) fn describe(&self, tool: &str) -> String {
        match self {
            ToolOutcome::Success => format!("{tool} succeeded"),
            ToolOutcome::Failed { code, stderr } => {
                let tail = last_line(stderr);
                match code {
                    Some(code) => format!("{tool} exited with status {code}: {tail}"),
                    None => format!("{tool} was terminated by a signal: {tail}"),
                }
            }
            ToolOutcome::NotFound => format!("{tool} was not found"),
            ToolOutcome::TimedOut => format!("{tool} timed out"),
            ToolOutcome::Cancelled => format!("{tool} was cancelled"),
            ToolOutcome::SpawnFailed(reason) => format!("{tool} could not be started: {reason}"),
        }
    }
}

/// Run `command` to completion, killing it once `timeout` elapses or
/// `cancel` is triggered.
pub(crate) fn run_tool(
    mut command: Command,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ToolOutcome {
    log::debug!("running {command:?}");
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(error) if error.kind() == ErrorKind::NotFound => return ToolOutcome::NotFound,
        Err(error) => return ToolOutcome::SpawnFailed(error.to_string()),
    };

    let stderr_thread = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buffer = String::new();
            let _ = stderr.read_to_string(&mut buffer);
            buffer
        })
    });
    let collect_stderr = |handle: Option<thread::JoinHandle<String>>| {
        handle
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    };

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stderr = collect_stderr(stderr_thread);
                return if status.success() {
                    ToolOutcome::Success
                } else {
                    ToolOutcome::Failed {
                        code: status.code(),
                        stderr,
                    }
                };
            }
            Ok(None) => {}
            Err(error) => {
                let _ = child.kill();
                let _ = child.wait();
                return ToolOutcome::SpawnFailed(error.to_string());
            }
        }

        let stop = if cancel.is_cancelled() {
            Some(ToolOutcome::Cancelled)
        } else if started.elapsed() >= timeout {
            Some(ToolOutcome::TimedOut)
        } else {
            None
        };
        if let Some(outcome) = stop {
            log::warn!("stopping {command:?} after {:?}", started.elapsed());
            let _ = child.kill();
            let _ = child.wait();
            collect_stderr(stderr_thread);
            return outcome;
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Last non-empty line of a tool's diagnostic output.
pub(crate) fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no diagnostic output")
}
