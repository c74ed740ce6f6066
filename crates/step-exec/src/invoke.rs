// Runs a resolved command: picks the working directory, applies the
// workspace-home override, streams output through the annotator, and maps
// the exit status onto the enclosing build result. The annotator is
// finalized on every exit path, including launch failure and cancellation.

use crate::annotate::ConsoleAnnotator;
use crate::assemble::ResolvedCommand;
use crate::context::ExecutionContext;
use crate::launcher::ProcessLauncher;
use std::error::Error as _;
use std::path::{Path, PathBuf};
use step_common::constants::env_vars;
use step_common::result::{BuildResult, InvocationResult};
use step_common::StepError;
use step_sdk::{CommandLine, TraceWriter};
use tokio::sync::mpsc;

/// Executes assembled command lines against the launcher seam.
pub struct Invoker<'a> {
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> Invoker<'a> {
    pub fn new(launcher: &'a dyn ProcessLauncher) -> Self {
        Self { launcher }
    }

    /// Pick the working directory: root build-script dir, else workspace,
    /// else the fallback workspace.
    pub fn working_directory(
        root_dir: Option<&Path>,
        ctx: &ExecutionContext,
    ) -> Result<PathBuf, StepError> {
        root_dir
            .map(Path::to_path_buf)
            .or_else(|| ctx.workspace.clone())
            .or_else(|| ctx.fallback_workspace.clone())
            .ok_or(StepError::WorkspaceUnavailable)
    }

    /// Run `command_line` and merge the outcome into the enclosing result.
    ///
    /// With `use_workspace_as_home` the tool's user home is pointed at the
    /// workspace so caches are not shared between builds. Launch-level
    /// failures are reported here (fatal diagnostic, result forced to
    /// failure) and come back as a non-successful `InvocationResult`, not
    /// an `Err`; only cancellation propagates.
    pub async fn invoke(
        &self,
        command_line: CommandLine,
        root_dir: Option<&Path>,
        use_workspace_as_home: bool,
        ctx: &mut ExecutionContext,
    ) -> Result<InvocationResult, StepError> {
        let working_dir = Self::working_directory(root_dir, ctx)?;

        if use_workspace_as_home {
            if let Some(home) = self.workspace_home_override(ctx) {
                ctx.environment
                    .insert(env_vars::USER_HOME.to_string(), home);
            }
        }

        let command = ResolvedCommand {
            command: command_line,
            environment: ctx.environment.clone(),
            working_dir,
        };

        ctx.trace()
            .verbose(&format!("Executing: {}", command.display()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancellation_token = ctx.cancellation_token();
        let encoding = ctx.encoding;

        let launch_result = {
            let mut annotator = ConsoleAnnotator::new(ctx.sink_mut(), encoding);
            let launch = self.launcher.launch(&command, tx, cancellation_token);
            tokio::pin!(launch);

            let mut output_open = true;
            let result = loop {
                tokio::select! {
                    result = &mut launch => break result,
                    chunk = rx.recv(), if output_open => match chunk {
                        Some(chunk) => annotator.process(&chunk),
                        None => output_open = false,
                    },
                }
            };

            // The launcher may finish before its last chunks are drained.
            while let Ok(chunk) = rx.try_recv() {
                annotator.process(&chunk);
            }
            annotator.force_eol();
            result
        };

        match launch_result {
            Ok(exit_code) => {
                let result = InvocationResult::from_exit_code(exit_code);
                ctx.record_result(result.outcome);
                if !result.succeeded() {
                    ctx.info(&format!("Build failed with exit code {exit_code}."));
                }
                Ok(result)
            }
            Err(StepError::Cancelled) => {
                ctx.record_result(BuildResult::Failure);
                Err(StepError::Cancelled)
            }
            Err(err) => {
                let detail = error_detail(&err);
                ctx.error(&format!("command execution failed: {detail}"));
                ctx.record_result(BuildResult::Failure);
                Ok(InvocationResult::launch_failure(detail))
            }
        }
    }

    /// The home directory override when per-workspace caches are on.
    fn workspace_home_override(&self, ctx: &ExecutionContext) -> Option<String> {
        ctx.workspace
            .as_ref()
            .or(ctx.fallback_workspace.as_ref())
            .map(|ws| ws.to_string_lossy().into_owned())
    }
}

/// Flatten an error and its source chain into one diagnostic string.
fn error_detail(err: &StepError) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemorySink, MockLauncher};

    fn command_line() -> CommandLine {
        let mut line = CommandLine::new();
        line.add("gradle").add("build");
        line
    }

    fn context() -> (ExecutionContext, MemorySink) {
        let sink = MemorySink::new();
        let ctx = ExecutionContext::new("/repo", Box::new(sink.clone()))
            .with_workspace("/work");
        (ctx, sink)
    }

    #[test]
    fn working_directory_prefers_root_dir() {
        let (ctx, _sink) = context();
        let dir =
            Invoker::working_directory(Some(Path::new("/repo/scripts")), &ctx).unwrap();
        assert_eq!(dir, PathBuf::from("/repo/scripts"));
    }

    #[test]
    fn working_directory_falls_back_to_workspace_then_fallback() {
        let (ctx, _sink) = context();
        assert_eq!(
            Invoker::working_directory(None, &ctx).unwrap(),
            PathBuf::from("/work")
        );

        let sink = MemorySink::new();
        let ctx = ExecutionContext::new("/repo", Box::new(sink))
            .with_fallback_workspace("/somewhere");
        assert_eq!(
            Invoker::working_directory(None, &ctx).unwrap(),
            PathBuf::from("/somewhere")
        );
    }

    #[test]
    fn no_workspace_anywhere_is_an_error() {
        let sink = MemorySink::new();
        let ctx = ExecutionContext::new("/repo", Box::new(sink));
        assert!(matches!(
            Invoker::working_directory(None, &ctx),
            Err(StepError::WorkspaceUnavailable)
        ));
    }

    #[tokio::test]
    async fn zero_exit_records_success() {
        let (mut ctx, _sink) = context();
        let launcher = MockLauncher::exit_with(0).with_output(&b"BUILD SUCCESSFUL\n"[..]);
        let result = Invoker::new(&launcher)
            .invoke(command_line(), None, false, &mut ctx)
            .await
            .unwrap();
        assert!(result.succeeded());
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(ctx.result(), Some(BuildResult::Success));
    }

    #[tokio::test]
    async fn nonzero_exit_records_failure() {
        let (mut ctx, sink) = context();
        let launcher = MockLauncher::exit_with(2);
        let result = Invoker::new(&launcher)
            .invoke(command_line(), None, false, &mut ctx)
            .await
            .unwrap();
        assert!(!result.succeeded());
        assert_eq!(result.exit_code, Some(2));
        assert_eq!(ctx.result(), Some(BuildResult::Failure));
        assert!(sink.contains("exit code 2"));
    }

    #[tokio::test]
    async fn output_reaches_the_sink_with_final_line_terminated() {
        let (mut ctx, sink) = context();
        let launcher = MockLauncher::exit_with(0)
            .with_output(&b":compileJava\nBUILD SUCC"[..])
            .with_output(&b"ESSFUL"[..]);
        Invoker::new(&launcher)
            .invoke(command_line(), None, false, &mut ctx)
            .await
            .unwrap();
        let lines = sink.lines();
        assert_eq!(lines[0], ":compileJava");
        assert_eq!(lines[1], "BUILD SUCCESSFUL");
    }

    #[tokio::test]
    async fn launch_failure_is_fatal_but_not_an_err() {
        let (mut ctx, sink) = context();
        let launcher = MockLauncher::launch_failure("No such file or directory");
        let result = Invoker::new(&launcher)
            .invoke(command_line(), None, false, &mut ctx)
            .await
            .unwrap();
        assert!(!result.succeeded());
        assert_eq!(result.exit_code, None);
        assert!(result.launch_failure.is_some());
        assert_eq!(ctx.result(), Some(BuildResult::Failure));
        assert!(sink.contains("command execution failed"));
        assert!(sink.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn cancellation_records_failure_then_propagates() {
        let (mut ctx, _sink) = context();
        let launcher = MockLauncher::cancelled();
        let err = Invoker::new(&launcher)
            .invoke(command_line(), None, false, &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Cancelled));
        assert_eq!(ctx.result(), Some(BuildResult::Failure));
    }

    #[tokio::test]
    async fn workspace_home_override_points_at_the_workspace() {
        let sink = MemorySink::new();
        let mut ctx = ExecutionContext::new("/repo", Box::new(sink))
            .with_workspace("/work/job-42");
        let launcher = MockLauncher::exit_with(0);
        Invoker::new(&launcher)
            .invoke(command_line(), None, true, &mut ctx)
            .await
            .unwrap();
        let launched = launcher.launched();
        assert_eq!(
            launched[0].environment.get(env_vars::USER_HOME).map(String::as_str),
            Some("/work/job-42")
        );
    }

    #[tokio::test]
    async fn home_is_untouched_without_the_override() {
        let (mut ctx, _sink) = context();
        let launcher = MockLauncher::exit_with(0);
        Invoker::new(&launcher)
            .invoke(command_line(), None, false, &mut ctx)
            .await
            .unwrap();
        let launched = launcher.launched();
        assert!(!launched[0].environment.contains_key(env_vars::USER_HOME));
    }
}
