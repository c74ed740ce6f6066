// The process-launcher seam. The engine only ever talks to the trait; the
// default implementation delegates to the sdk process invoker, and tests
// substitute a scripted mock.

use crate::assemble::ResolvedCommand;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use step_common::StepError;
use step_sdk::process_invoker::ProcessError;
use step_sdk::{ProcessInvoker, TraceWriter, TracingTraceWriter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Launches a resolved command and reports its exit code.
///
/// Output bytes are sent on `output` as they arrive; the sender must be
/// dropped when the stream ends. An `Err` is a launch-level failure or a
/// cancellation — never a nonzero exit, which comes back as `Ok(code)`.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(
        &self,
        command: &ResolvedCommand,
        output: mpsc::UnboundedSender<Bytes>,
        cancellation_token: CancellationToken,
    ) -> Result<i32, StepError>;
}

/// Production launcher over the sdk process invoker.
pub struct DefaultLauncher {
    trace: Arc<dyn TraceWriter>,
}

impl DefaultLauncher {
    pub fn new(trace: Arc<dyn TraceWriter>) -> Self {
        Self { trace }
    }
}

impl Default for DefaultLauncher {
    fn default() -> Self {
        Self::new(Arc::new(TracingTraceWriter))
    }
}

#[async_trait]
impl ProcessLauncher for DefaultLauncher {
    async fn launch(
        &self,
        command: &ResolvedCommand,
        output: mpsc::UnboundedSender<Bytes>,
        cancellation_token: CancellationToken,
    ) -> Result<i32, StepError> {
        let invoker = ProcessInvoker::new(self.trace.clone());
        invoker
            .execute(
                &command.argv(),
                &command.environment,
                &command.working_dir,
                output,
                cancellation_token,
            )
            .await
            .map_err(|err| match err {
                ProcessError::Launch { file_name, source }
                | ProcessError::Wait { file_name, source } => StepError::Launch {
                    file: file_name,
                    source,
                },
                ProcessError::Cancelled => StepError::Cancelled,
            })
    }
}
