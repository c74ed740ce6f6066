// Error taxonomy of the build-step executor. Nonzero exit codes are NOT
// errors; they are ordinary outcomes carried by InvocationResult.

/// Terminal failures of a single invocation.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A named installation matched but no executable could be determined
    /// for the current platform.
    #[error("cannot determine the executable of installation '{name}'")]
    ExecutableUnresolved { name: String },

    /// The process could not be started at all.
    #[error("failed to launch '{file}'")]
    Launch {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// No working directory could be derived: no root build-script
    /// directory, no workspace, no fallback workspace.
    #[error("no workspace available to run the build in")]
    WorkspaceUnavailable,

    /// The invocation was interrupted; the child has been terminated.
    #[error("invocation cancelled")]
    Cancelled,
}
