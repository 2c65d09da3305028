//! Subprocess execution with a wall-clock limit
//!
//! `std::process::Command::output()` blocks forever. The analyzers we shell
//! out to can hang on pathological input (deep macro expansion, huge include
//! graphs), so we poll the child instead and kill it when the limit passes.
//!
//! Both pipes are drained on helper threads while we poll. Cppcheck writes
//! every finding to stderr, and a child blocked on a full pipe would never
//! exit on its own.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured output of a finished tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Run `cmd` to completion, or kill it once `timeout` has elapsed.
///
/// `tool` is only used for error messages and logs.
pub fn run_with_timeout(tool: &str, mut cmd: Command, timeout: Duration) -> Result<ToolOutput> {
    let start = Instant::now();
    debug!(tool, command = ?cmd, "spawning");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::ToolUnavailable {
            tool: tool.to_string(),
            source,
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if start.elapsed() >= timeout {
                    warn!(tool, timeout_secs = timeout.as_secs(), "killing tool after timeout");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        tool: tool.to_string(),
                        after: timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    let output = ToolOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
        elapsed: start.elapsed(),
    };
    debug!(
        tool,
        exit = ?output.status.code(),
        elapsed_ms = output.elapsed.as_millis() as u64,
        "tool finished"
    );
    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
