// step-sdk: Foundation layer for the Gradle build-step executor.
// This crate has ZERO dependencies on other step crates and provides the
// process lifecycle, command-line building, and trace abstractions.

pub mod command_line;
pub mod process_invoker;
pub mod trace;

// Re-export commonly used items at crate root
pub use command_line::CommandLine;
pub use process_invoker::{ProcessError, ProcessInvoker};
pub use trace::{CollectingTraceWriter, NullTraceWriter, TraceLevel, TraceWriter, TracingTraceWriter};
