// step-common: Shared services and vocabulary for the Gradle build-step
// executor. Depends only on step-sdk.

pub mod constants;
pub mod error;
pub mod result;
pub mod secret_masker;
pub mod tracing;

pub use constants::{TargetPlatform, CURRENT_PLATFORM};
pub use error::StepError;
pub use result::{BuildResult, InvocationResult};
pub use secret_masker::SecretMasker;
pub use tracing::{TraceEventType, TraceManager, TraceSetting, Tracing};
