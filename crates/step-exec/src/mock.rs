// Test doubles for the launcher seam and the output sink. Shipped (not
// test-gated) so host pipelines can exercise their own step wiring with
// simulated exit codes and launch failures.

use crate::annotate::OutputSink;
use crate::assemble::ResolvedCommand;
use crate::launcher::ProcessLauncher;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use step_common::StepError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sink that keeps every line in memory. Cloning shares the storage, so
/// a test can hold a handle while the context owns the sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

impl OutputSink for MemorySink {
    fn write_line(&mut self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// What the mock launcher should pretend happened.
#[derive(Debug, Clone)]
enum MockOutcome {
    Exit(i32),
    LaunchFailure(String),
    Cancelled,
}

/// Scripted launcher: emits configured output chunks, then reports the
/// configured outcome. Records every launched command for assertions.
#[derive(Clone)]
pub struct MockLauncher {
    chunks: Vec<Bytes>,
    outcome: MockOutcome,
    launched: Arc<Mutex<Vec<ResolvedCommand>>>,
}

impl MockLauncher {
    /// A launcher that exits with `code` after emitting nothing.
    pub fn exit_with(code: i32) -> Self {
        Self {
            chunks: Vec::new(),
            outcome: MockOutcome::Exit(code),
            launched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A launcher that fails to start the process.
    pub fn launch_failure(detail: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            outcome: MockOutcome::LaunchFailure(detail.into()),
            launched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A launcher whose invocation is cancelled mid-flight.
    pub fn cancelled() -> Self {
        Self {
            chunks: Vec::new(),
            outcome: MockOutcome::Cancelled,
            launched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a raw output chunk emitted before the outcome is reported.
    pub fn with_output(mut self, chunk: impl Into<Bytes>) -> Self {
        self.chunks.push(chunk.into());
        self
    }

    /// Every command launched so far, in order.
    pub fn launched(&self) -> Vec<ResolvedCommand> {
        self.launched.lock().clone()
    }
}

#[async_trait]
impl ProcessLauncher for MockLauncher {
    async fn launch(
        &self,
        command: &ResolvedCommand,
        output: mpsc::UnboundedSender<Bytes>,
        _cancellation_token: CancellationToken,
    ) -> Result<i32, StepError> {
        self.launched.lock().push(command.clone());
        match &self.outcome {
            MockOutcome::LaunchFailure(detail) => Err(StepError::Launch {
                file: command.argv().first().cloned().unwrap_or_default(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, detail.clone()),
            }),
            MockOutcome::Cancelled => Err(StepError::Cancelled),
            MockOutcome::Exit(code) => {
                for chunk in &self.chunks {
                    let _ = output.send(chunk.clone());
                }
                Ok(*code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> ResolvedCommand {
        let mut line = step_sdk::CommandLine::new();
        line.add("gradle").add("build");
        ResolvedCommand {
            command: line,
            environment: Default::default(),
            working_dir: std::path::PathBuf::from("."),
        }
    }

    #[tokio::test]
    async fn mock_records_commands_and_reports_exit() {
        let launcher = MockLauncher::exit_with(3).with_output(&b"out\n"[..]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let code = launcher
            .launch(&command(), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(code, 3);
        assert_eq!(launcher.launched().len(), 1);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"out\n"));
    }

    #[tokio::test]
    async fn mock_launch_failure_is_a_step_error() {
        let launcher = MockLauncher::launch_failure("no such file");
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = launcher
            .launch(&command(), tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Launch { .. }));
    }

    #[test]
    fn memory_sink_shares_lines_across_clones() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_line("hello");
        assert!(sink.contains("hello"));
        assert_eq!(sink.lines(), vec!["hello"]);
    }
}
