//! Command Runner.
//!
//! Executes one external command under a bounded timeout and returns a
//! classified [`ProcessOutcome`]. The runner never propagates an error
//! across its boundary: every failure mode, including spawn errors, is
//! folded into the outcome so callers always get a record back.
//!
//! Timeout policy: on expiry the child is sent a kill and given a short
//! grace period to be reaped. A child that ignores the kill is abandoned
//! and may keep running in the background; operations surface that to the
//! operator in the timeout message rather than hiding it.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::{FailureKind, ProcessOutcome, ToolRequest};

/// How long a killed child gets to be reaped before we abandon it.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Stateless executor; concurrent `run` calls are fully independent, each
/// owning its process handle for the lifetime of the call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Runner;

impl Runner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, req: &ToolRequest) -> ProcessOutcome {
        let Some((program, args)) = req.command.split_first() else {
            return outcome(None, String::new(), String::new(), Some(unexpected("empty command line")));
        };
        debug!(command = ?req.command, timeout = ?req.timeout, "spawning external command");

        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => return spawn_failure(err),
        };

        // Drain both pipes concurrently so output produced before a timeout
        // is preserved in the outcome.
        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        match tokio::time::timeout(req.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = decode_fixed(&collect(stdout_task).await);
                let stderr = decode_fixed(&collect(stderr_task).await);
                classify_exit(status.code(), stdout, stderr)
            }
            Ok(Err(err)) => {
                let stdout = decode_fixed(&collect(stdout_task).await);
                let stderr = decode_fixed(&collect(stderr_task).await);
                warn!(%err, "waiting on child failed");
                outcome(None, stdout, stderr, Some(unexpected(err)))
            }
            Err(_elapsed) => {
                let _ = child.start_kill();
                if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
                    warn!(command = ?req.command, "child ignored kill request, abandoning it");
                }
                // The pipes close once the child dies; bound the collection so
                // an abandoned child cannot stall us here.
                let stdout = decode_fixed(&collect_bounded(stdout_task).await);
                let stderr = decode_fixed(&collect_bounded(stderr_task).await);
                outcome(None, stdout, stderr, Some(FailureKind::Timeout))
            }
        }
    }
}

fn drain(pipe: Option<impl tokio::io::AsyncRead + Unpin + Send + 'static>) -> JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

async fn collect(task: JoinHandle<Vec<u8>>) -> Vec<u8> {
    task.await.unwrap_or_default()
}

async fn collect_bounded(task: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(KILL_GRACE, task).await {
        Ok(Ok(buf)) => buf,
        _ => Vec::new(),
    }
}

/// Decode captured process output with the fixed legacy codepage (GBK /
/// cp936). Invalid sequences are substituted, never rejected; output is
/// never lost to a decode fault.
pub fn decode_fixed(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::GBK.decode(bytes);
    text.into_owned()
}

fn classify_exit(code: Option<i32>, stdout: String, stderr: String) -> ProcessOutcome {
    let failure = match code {
        Some(0) => None,
        Some(_) => Some(FailureKind::NonZeroExit),
        None => Some(unexpected("process terminated without an exit code")),
    };
    outcome(code, stdout, stderr, failure)
}

fn spawn_failure(err: std::io::Error) -> ProcessOutcome {
    let failure = match err.kind() {
        std::io::ErrorKind::NotFound => FailureKind::ToolNotFound,
        std::io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
        _ => unexpected(err),
    };
    outcome(None, String::new(), String::new(), Some(failure))
}

fn unexpected(detail: impl ToString) -> FailureKind {
    FailureKind::Unexpected(detail.to_string())
}

fn outcome(
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    failure: Option<FailureKind>,
) -> ProcessOutcome {
    ProcessOutcome {
        exit_code,
        stdout,
        stderr,
        failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn req(parts: &[&str], secs: u64) -> ToolRequest {
        ToolRequest::new(parts.iter().copied(), Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn missing_executable_is_tool_not_found() {
        let out = Runner::new().run(&req(&["winmaint-no-such-tool-xyz"], 5)).await;
        assert_eq!(out.failure, Some(FailureKind::ToolNotFound));
        assert_eq!(out.exit_code, None);
    }

    #[tokio::test]
    async fn empty_command_is_unexpected() {
        let out = Runner::new()
            .run(&ToolRequest::new(Vec::<String>::new(), Duration::from_secs(1)))
            .await;
        assert!(matches!(out.failure, Some(FailureKind::Unexpected(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn long_sleep_times_out_promptly() {
        let started = Instant::now();
        let out = Runner::new().run(&req(&["sleep", "30"], 2)).await;
        assert_eq!(out.failure, Some(FailureKind::Timeout));
        assert_eq!(out.exit_code, None);
        // Well under the sleep duration: the timeout fired, not the sleep.
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn partial_output_survives_a_timeout() {
        let out = Runner::new()
            .run(&req(&["sh", "-c", "echo early; sleep 30"], 2))
            .await;
        assert_eq!(out.failure, Some(FailureKind::Timeout));
        assert!(out.stdout.contains("early"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_zero_iff_no_failure() {
        for code in [0, 1, 2, 3, 17, 255] {
            let out = Runner::new()
                .run(&req(&["sh", "-c", &format!("exit {code}")], 5))
                .await;
            assert_eq!(out.exit_code, Some(code));
            assert_eq!(out.failure.is_none(), code == 0, "code {code}");
            if code != 0 {
                assert_eq!(out.failure, Some(FailureKind::NonZeroExit));
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_is_captured_on_failure() {
        let out = Runner::new()
            .run(&req(&["sh", "-c", "echo oops >&2; exit 4"], 5))
            .await;
        assert_eq!(out.failure, Some(FailureKind::NonZeroExit));
        assert!(out.stderr.contains("oops"));
    }

    #[test]
    fn decode_never_fails_on_arbitrary_bytes() {
        let inputs: [&[u8]; 4] = [
            b"plain ascii",
            &[0xff, 0xfe, 0x80, 0x81],
            &[0xc4, 0xe3, 0xba, 0xc3], // "ni hao" in GBK
            &[],
        ];
        for bytes in inputs {
            let text = decode_fixed(bytes);
            // Well-formed UTF-8 by construction; invalid input shows up as
            // substitution characters rather than an error.
            assert!(text.chars().count() <= bytes.len().max(1));
        }
        assert_eq!(decode_fixed(&[0xc4, 0xe3, 0xba, 0xc3]), "你好");
        assert!(decode_fixed(&[0xff]).contains('\u{fffd}'));
    }
}
