// The build step itself: normalize the configured fields, resolve the
// executable, assemble the argument vector, and hand it to the invoker.

use crate::assemble::assemble_arguments;
use crate::context::ExecutionContext;
use crate::expand::{normalize_step, MacroExpander};
use crate::installation::InstallationLookup;
use crate::invoke::Invoker;
use crate::launcher::ProcessLauncher;
use crate::resolver::ExecutableResolver;
use crate::StepConfig;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use step_common::result::BuildResult;
use step_common::StepError;

/// The injected collaborators a step needs at run time: the installation
/// registry, the host's variable-substitution service, and the process
/// launcher.
#[derive(Clone)]
pub struct StepServices {
    pub lookup: Arc<dyn InstallationLookup>,
    pub expander: Arc<dyn MacroExpander>,
    pub launcher: Arc<dyn ProcessLauncher>,
}

impl StepServices {
    pub fn new(
        lookup: Arc<dyn InstallationLookup>,
        expander: Arc<dyn MacroExpander>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            lookup,
            expander,
            launcher,
        }
    }
}

/// One configured build step. The configuration is immutable and shared;
/// every invocation gets its own `ExecutionContext`.
#[derive(Debug, Clone)]
pub struct GradleStep {
    config: StepConfig,
}

impl GradleStep {
    pub fn new(config: StepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Run the step. Returns whether the invocation succeeded; the
    /// enclosing result in `ctx` is updated either way.
    pub async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        services: &StepServices,
    ) -> Result<bool> {
        self.run(false, ctx, services).await
    }

    /// Run the step in dry-run mode: identical, except the dry-run switch
    /// asks the tool to report planned work without executing it.
    pub async fn execute_dry_run(
        &self,
        ctx: &mut ExecutionContext,
        services: &StepServices,
    ) -> Result<bool> {
        self.run(true, ctx, services).await
    }

    async fn run(
        &self,
        dry_run: bool,
        ctx: &mut ExecutionContext,
        services: &StepServices,
    ) -> Result<bool> {
        ctx.info("Launching build.");

        let fields = normalize_step(
            &self.config,
            dry_run,
            services.expander.as_ref(),
            &ctx.environment,
            ctx.variables(),
        );

        // Relative root dirs resolve against the module root; absolute
        // ones stand alone.
        let root_dir: Option<PathBuf> = fields
            .root_build_script_dir
            .as_deref()
            .map(|dir| ctx.module_root.join(dir));

        let trace = ctx.trace().clone();
        let resolver = ExecutableResolver {
            lookup: services.lookup.as_ref(),
            expander: services.expander.as_ref(),
            trace: &trace,
        };
        let resolution = match resolver.resolve(
            &self.config,
            &fields,
            root_dir.as_deref(),
            &ctx.module_root,
            ctx.platform,
            &ctx.tool_locations,
            &mut ctx.environment,
        ) {
            Ok(resolution) => resolution,
            Err(err) => {
                ctx.error(&err.to_string());
                ctx.record_result(BuildResult::Failure);
                return Ok(false);
            }
        };

        let properties = ctx.variables().sanitized();
        let sensitive = ctx.variables().sensitive_keys();
        let command_line = assemble_arguments(
            &resolution.command_string(),
            &properties,
            &sensitive,
            &fields,
            ctx.platform,
        );

        let invoker = Invoker::new(services.launcher.as_ref());
        match invoker
            .invoke(
                command_line,
                root_dir.as_deref(),
                self.config.use_workspace_as_home,
                ctx,
            )
            .await
        {
            Ok(result) => Ok(result.succeeded()),
            Err(StepError::WorkspaceUnavailable) => {
                ctx.error(&StepError::WorkspaceUnavailable.to_string());
                ctx.record_result(BuildResult::Failure);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}
