// step-exec: The build-step execution engine. Resolves which Gradle
// executable to run, assembles the command line, and invokes it with the
// right environment, working directory, and output handling.

pub mod annotate;
pub mod assemble;
pub mod config;
pub mod context;
pub mod expand;
pub mod installation;
pub mod invoke;
pub mod launcher;
pub mod mock;
pub mod resolver;
pub mod step;
pub mod variables;

// ---------------------------------------------------------------------------
// Re-exports for convenient access
// ---------------------------------------------------------------------------

pub use annotate::{ConsoleAnnotator, OutputEncoding, OutputSink, WriterSink};
pub use assemble::{assemble_arguments, ResolvedCommand};
pub use config::StepConfig;
pub use context::ExecutionContext;
pub use expand::{DefaultMacroExpander, MacroExpander, NormalizedFields};
pub use installation::{GradleInstallation, InstallationLookup, StaticInstallationLookup};
pub use invoke::Invoker;
pub use launcher::{DefaultLauncher, ProcessLauncher};
pub use mock::{MemorySink, MockLauncher};
pub use resolver::{ExecutableResolution, ExecutableResolver};
pub use step::{GradleStep, StepServices};
pub use variables::{BuildVariable, BuildVariables};
