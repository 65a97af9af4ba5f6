//! Child-process execution with a hard timeout and bounded output capture.

use std::io::Read;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::time::Duration;

use tracing::debug;
use tracing::warn;
use wait_timeout::ChildExt;

use crate::error::SandboxError;

/// Captured output of a finished (or killed) child process.
#[derive(Debug)]
pub struct ChildOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Spawn `cmd` and wait at most `timeout` for it to exit, draining stdout
/// and stderr concurrently so a chatty child cannot deadlock on a full pipe.
/// On timeout the child is killed and reaped before returning.
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit: usize,
) -> Result<ChildOutput, SandboxError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(?timeout, "spawning child process");
    let mut child = cmd.spawn().map_err(SandboxError::Spawn)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SandboxError::setup("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SandboxError::setup("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_limited(stdout, output_limit));
    let stderr_handle = thread::spawn(move || read_limited(stderr, output_limit));

    let mut timed_out = false;
    let status = match child
        .wait_timeout(timeout)
        .map_err(SandboxError::Spawn)?
    {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "child timed out, killing");
            timed_out = true;
            child.kill().map_err(SandboxError::Spawn)?;
            child.wait().map_err(SandboxError::Spawn)?
        }
    };

    let stdout = join_reader(stdout_handle)?;
    let stderr = join_reader(stderr_handle)?;
    debug!(exit_code = ?status.code(), timed_out, "child finished");

    Ok(ChildOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

/// Read up to `limit` bytes, then keep draining so the child never blocks on
/// a full pipe; bytes past the limit are discarded.
fn read_limited(mut reader: impl Read, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok(kept)
}

fn join_reader(
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<String, SandboxError> {
    let bytes = handle
        .join()
        .map_err(|_| SandboxError::setup("output reader thread panicked"))?
        .map_err(SandboxError::Spawn)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_stderr_separately() {
        let out = run_with_timeout(sh("echo out; echo err >&2"), Duration::from_secs(5), 4096)
            .expect("run");
        assert!(out.status.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.timed_out);
    }

    #[test]
    fn reports_nonzero_exit() {
        let out = run_with_timeout(sh("exit 3"), Duration::from_secs(5), 4096).expect("run");
        assert_eq!(out.status.code(), Some(3));
    }

    #[test]
    fn kills_on_timeout() {
        let start = std::time::Instant::now();
        let out = run_with_timeout(sh("sleep 30"), Duration::from_millis(300), 4096).expect("run");
        assert!(out.timed_out);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn bounds_captured_output() {
        let out = run_with_timeout(
            sh("yes x | head -c 100000"),
            Duration::from_secs(10),
            1024,
        )
        .expect("run");
        assert!(out.stdout.len() <= 1024);
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let cmd = Command::new("definitely-not-a-real-binary-xyz");
        let err = run_with_timeout(cmd, Duration::from_secs(1), 4096).unwrap_err();
        assert!(matches!(err, SandboxError::Spawn(_)));
    }
}
