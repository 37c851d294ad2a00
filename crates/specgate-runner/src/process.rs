//! Host process execution with cancellation and timeouts.

use async_trait::async_trait;
use specgate_core::{Error, ProcessExecutor, ProcessInvocation, ProcessResult, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Output stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Executor that spawns real processes on the host.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessExecutor {
    /// Applied when an invocation carries no timeout of its own.
    default_timeout: Option<Duration>,
}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout: Some(timeout),
        }
    }
}

enum Exit {
    Finished(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

async fn collect_output<R>(reader: R, program: String, stream: OutputStream) -> String
where
    R: AsyncRead + Unpin,
{
    // Raw byte lines: invalid UTF-8 must not end the drain while the child
    // is still writing.
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut captured = String::new();
    loop {
        match segments.next_segment().await {
            Ok(Some(mut bytes)) => {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                let line = String::from_utf8_lossy(&bytes);
                trace!(program = %program, stream = ?stream, "{}", line);
                captured.push_str(&line);
                captured.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!(program = %program, stream = ?stream, error = %e, "Failed to read process output");
                break;
            }
        }
    }
    captured
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> Result<ProcessResult> {
        let program = invocation.display_name();
        let start = std::time::Instant::now();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled { program });
        }

        debug!(command = %invocation.command_line(), "Spawning process");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| Error::ProcessStart {
            program: invocation.program.display().to_string(),
            message: e.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("stderr was not captured".into()))?;

        let stdout_handle = tokio::spawn(collect_output(
            stdout,
            program.clone(),
            OutputStream::Stdout,
        ));
        let stderr_handle = tokio::spawn(collect_output(
            stderr,
            program.clone(),
            OutputStream::Stderr,
        ));

        let timeout = invocation.timeout.or(self.default_timeout);
        let deadline = async {
            match timeout {
                Some(limit) => {
                    sleep(limit).await;
                    limit
                }
                None => std::future::pending::<Duration>().await,
            }
        };

        let exit = tokio::select! {
            status = child.wait() => Exit::Finished(status),
            _ = cancel.cancelled() => Exit::Cancelled,
            limit = deadline => Exit::TimedOut(limit),
        };

        let status = match exit {
            Exit::Finished(status) => status.map_err(|e| {
                Error::Internal(format!("Failed to wait for {}: {}", program, e))
            })?,
            Exit::Cancelled => {
                warn!(program = %program, "Cancellation requested, killing process");
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                return Err(Error::Cancelled { program });
            }
            Exit::TimedOut(limit) => {
                warn!(program = %program, timeout_secs = limit.as_secs(), "Process timed out, killing it");
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                return Err(Error::Timeout {
                    program,
                    seconds: limit.as_secs(),
                });
            }
        };

        let stdout = stdout_handle.await.unwrap_or_default();
        let stderr = stderr_handle.await.unwrap_or_default();

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(program = %program, exit_code, duration_ms, "Process completed");

        Ok(ProcessResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}
