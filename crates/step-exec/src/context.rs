// Per-invocation execution state. Created fresh for every run of a step
// and discarded when the child process is gone; only StepConfig outlives
// an invocation.

use crate::annotate::{OutputEncoding, OutputSink};
use crate::variables::BuildVariables;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use step_common::result::BuildResult;
use step_common::{SecretMasker, TargetPlatform, TraceSetting, Tracing, CURRENT_PLATFORM};
use tokio_util::sync::CancellationToken;

/// Prefix on progress lines the executor writes to the build log, so its
/// own lines are distinguishable from the tool's output.
const LOG_PREFIX: &str = "[gradle]";

/// State of one invocation, supplied by the host pipeline.
///
/// The environment is a private copy: writes (tool home, user-home
/// override) never leak back into the host. The enclosing build result is
/// merge-only; once an invocation records `Failure` nothing can flip it
/// back to `Success`.
pub struct ExecutionContext {
    /// Mutable environment copy handed to the child.
    pub environment: HashMap<String, String>,

    /// Workspace root, when the build runs attached to one.
    pub workspace: Option<PathBuf>,

    /// Checked-out project root the step's relative paths resolve
    /// against.
    pub module_root: PathBuf,

    /// Last-resort working directory when no workspace is attached.
    pub fallback_workspace: Option<PathBuf>,

    /// Per-node overrides of installation homes, keyed by tool name.
    pub tool_locations: HashMap<String, PathBuf>,

    /// Platform the command line is built for.
    pub platform: TargetPlatform,

    /// Encoding used to decode the child's output.
    pub encoding: OutputEncoding,

    variables: BuildVariables,
    sink: Box<dyn OutputSink>,
    result: Option<BuildResult>,
    masker: Arc<SecretMasker>,
    trace: Tracing,
    cancellation_token: CancellationToken,
}

impl ExecutionContext {
    pub fn new(module_root: impl Into<PathBuf>, sink: Box<dyn OutputSink>) -> Self {
        let masker = Arc::new(SecretMasker::new());
        let trace = Tracing::new("GradleStep", masker.clone(), TraceSetting::default());
        Self {
            environment: HashMap::new(),
            workspace: None,
            module_root: module_root.into(),
            fallback_workspace: None,
            tool_locations: HashMap::new(),
            platform: CURRENT_PLATFORM,
            encoding: OutputEncoding::default(),
            variables: BuildVariables::new(),
            sink,
            result: None,
            masker,
            trace,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_fallback_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.fallback_workspace = Some(workspace.into());
        self
    }

    pub fn with_platform(mut self, platform: TargetPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    pub fn with_tool_location(
        mut self,
        name: impl Into<String>,
        location: impl Into<PathBuf>,
    ) -> Self {
        self.tool_locations.insert(name.into(), location.into());
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Install the invocation's build variables, registering every
    /// sensitive value with the masker.
    pub fn set_build_variables(&mut self, variables: BuildVariables) {
        variables.register_secrets(&self.masker);
        self.variables = variables;
    }

    pub fn variables(&self) -> &BuildVariables {
        &self.variables
    }

    pub fn masker(&self) -> &Arc<SecretMasker> {
        &self.masker
    }

    pub fn trace(&self) -> &Tracing {
        &self.trace
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn sink_mut(&mut self) -> &mut dyn OutputSink {
        self.sink.as_mut()
    }

    /// Merge an invocation outcome into the enclosing result. Failure is
    /// absorbing; the merged value is returned.
    pub fn record_result(&mut self, incoming: BuildResult) -> BuildResult {
        let merged = BuildResult::merge(self.result, incoming);
        self.result = Some(merged);
        merged
    }

    pub fn result(&self) -> Option<BuildResult> {
        self.result
    }

    /// Write a progress line to the build log, masked.
    pub fn info(&mut self, message: &str) {
        let line = format!("{LOG_PREFIX} {}", self.masker.mask(message));
        self.sink.write_line(&line);
    }

    /// Write an error line to the build log, masked, and mirror it to the
    /// trace source.
    pub fn error(&mut self, message: &str) {
        use step_sdk::TraceWriter;
        self.trace.error(message);
        let line = format!("{LOG_PREFIX} ERROR: {}", self.masker.mask(message));
        self.sink.write_line(&line);
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("workspace", &self.workspace)
            .field("module_root", &self.module_root)
            .field("platform", &self.platform)
            .field("variables", &self.variables.len())
            .field("result", &self.result)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemorySink;

    fn context_with_sink() -> (ExecutionContext, MemorySink) {
        let sink = MemorySink::new();
        let ctx = ExecutionContext::new("/work/project", Box::new(sink.clone()));
        (ctx, sink)
    }

    #[test]
    fn record_result_never_downgrades_failure() {
        let (mut ctx, _sink) = context_with_sink();
        assert_eq!(ctx.result(), None);
        assert_eq!(ctx.record_result(BuildResult::Failure), BuildResult::Failure);
        assert_eq!(ctx.record_result(BuildResult::Success), BuildResult::Failure);
        assert_eq!(ctx.result(), Some(BuildResult::Failure));
    }

    #[test]
    fn record_result_upgrades_to_failure() {
        let (mut ctx, _sink) = context_with_sink();
        ctx.record_result(BuildResult::Success);
        ctx.record_result(BuildResult::Failure);
        assert_eq!(ctx.result(), Some(BuildResult::Failure));
    }

    #[test]
    fn info_lines_are_prefixed_and_masked() {
        let (mut ctx, sink) = context_with_sink();
        let mut variables = BuildVariables::new();
        variables.set_sensitive("TOKEN", "hunter2");
        ctx.set_build_variables(variables);

        ctx.info("launching with hunter2");
        assert_eq!(sink.lines(), vec!["[gradle] launching with ***"]);
    }

    #[test]
    fn error_lines_are_marked() {
        let (mut ctx, sink) = context_with_sink();
        ctx.error("it broke");
        assert_eq!(sink.lines(), vec!["[gradle] ERROR: it broke"]);
    }
}
