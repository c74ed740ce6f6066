// Child-process lifecycle for build tool invocations: spawn with an
// argument vector, environment overrides, and working directory; stream
// combined stdout/stderr as raw byte chunks; cancel with signal escalation.

use crate::trace::TraceWriter;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long to wait after SIGINT before escalating to SIGTERM.
const SIGINT_TIMEOUT: Duration = Duration::from_millis(7500);
/// How long to wait after SIGTERM before escalating to a hard kill.
const SIGTERM_TIMEOUT: Duration = Duration::from_millis(2500);

/// Size of the read buffer used for each output chunk.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A failure at the process boundary, distinct from a nonzero exit code.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The process could not be started at all.
    #[error("failed to launch '{file_name}'")]
    Launch {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the running process failed.
    #[error("failed waiting for '{file_name}'")]
    Wait {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    /// The invocation was cancelled; the child has been terminated.
    #[error("process cancelled")]
    Cancelled,
}

/// Spawns a child process and streams its combined stdout/stderr as raw
/// byte chunks over an unbounded channel, so the consumer can assemble
/// lines itself (and observe a final unterminated line).
///
/// Cancellation escalates SIGINT, then SIGTERM, then a hard kill on Unix;
/// on other platforms it kills immediately.
pub struct ProcessInvoker {
    trace: Arc<dyn TraceWriter>,
}

impl ProcessInvoker {
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }

    /// Run `argv` to completion and return its exit code.
    ///
    /// `argv[0]` is the executable; the rest are passed verbatim.
    /// `environment` entries override the inherited environment. Output
    /// chunks are sent on `output_tx` as they arrive; the sender is
    /// dropped when both streams reach end of file.
    pub async fn execute(
        &self,
        argv: &[String],
        environment: &HashMap<String, String>,
        working_directory: &Path,
        output_tx: mpsc::UnboundedSender<Bytes>,
        cancellation_token: CancellationToken,
    ) -> Result<i32, ProcessError> {
        let file_name = argv.first().cloned().unwrap_or_default();
        debug_assert!(!file_name.is_empty(), "argv must contain an executable");

        self.trace.verbose(&format!(
            "Starting process '{}' with {} argument(s) in '{}'.",
            file_name,
            argv.len().saturating_sub(1),
            working_directory.display()
        ));

        let mut cmd = Command::new(&file_name);
        cmd.args(&argv[1..]);
        cmd.envs(environment);
        if working_directory.is_dir() {
            cmd.current_dir(working_directory);
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.stdin(std::process::Stdio::null());

        let start = std::time::Instant::now();
        let mut child = cmd.spawn().map_err(|source| ProcessError::Launch {
            file_name: file_name.clone(),
            source,
        })?;

        let pid = child.id().unwrap_or(0);
        self.trace
            .verbose(&format!("Process started with id {pid}."));

        let stdout_task = spawn_reader(child.stdout.take(), output_tx.clone());
        let stderr_task = spawn_reader(child.stderr.take(), output_tx);

        let mut cancelled = false;
        let exit_code = tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| ProcessError::Wait {
                    file_name: file_name.clone(),
                    source,
                })?;
                status.code().unwrap_or(-1)
            }
            _ = cancellation_token.cancelled() => {
                cancelled = true;
                self.trace.info("Cancellation requested, terminating process.");
                self.terminate(&mut child).await
            }
        };

        let _ = stdout_task.await;
        let _ = stderr_task.await;

        self.trace.verbose(&format!(
            "Process {pid} finished with exit code {exit_code} after {:.2?}.",
            start.elapsed()
        ));

        if cancelled {
            return Err(ProcessError::Cancelled);
        }
        Ok(exit_code)
    }

    /// Terminate a running child, escalating on Unix. Returns the exit
    /// code observed after termination.
    async fn terminate(&self, child: &mut tokio::process::Child) -> i32 {
        #[cfg(unix)]
        {
            if self
                .signal_and_wait(child, nix::sys::signal::Signal::SIGINT, SIGINT_TIMEOUT)
                .await
            {
                self.trace.verbose("Process stopped after SIGINT.");
                return wait_code(child).await;
            }
            if self
                .signal_and_wait(child, nix::sys::signal::Signal::SIGTERM, SIGTERM_TIMEOUT)
                .await
            {
                self.trace.verbose("Process stopped after SIGTERM.");
                return wait_code(child).await;
            }
        }

        self.trace
            .verbose("Killing process after ignored termination signals.");
        let _ = child.kill().await;
        wait_code(child).await
    }

    /// Send `signal` to the child and wait up to `timeout` for it to exit.
    /// Returns true once the process has exited.
    #[cfg(unix)]
    async fn signal_and_wait(
        &self,
        child: &mut tokio::process::Child,
        signal: nix::sys::signal::Signal,
        timeout: Duration,
    ) -> bool {
        let pid = match child.id() {
            Some(id) => id,
            // Already exited
            None => return true,
        };

        if nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal).is_err() {
            self.trace
                .verbose(&format!("Failed to send {signal:?} to process {pid}."));
            return false;
        }

        tokio::select! {
            result = child.wait() => result.is_ok(),
            _ = tokio::time::sleep(timeout) => {
                self.trace.verbose(&format!(
                    "Process {pid} did not honor {signal:?} within {:.1}s.",
                    timeout.as_secs_f64()
                ));
                false
            }
        }
    }
}

async fn wait_code(child: &mut tokio::process::Child) -> i32 {
    child
        .wait()
        .await
        .map(|s| s.code().unwrap_or(-1))
        .unwrap_or(-1)
}

/// Forward raw chunks from one output stream to the shared channel until
/// end of file. The sender clone is dropped when the task finishes.
fn spawn_reader<R>(
    stream: Option<R>,
    tx: mpsc::UnboundedSender<Bytes>,
) -> tokio::task::JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut stream) = stream else {
            return;
        };
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
