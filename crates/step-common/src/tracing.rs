// Per-component trace sources. Every message passes through the shared
// SecretMasker before reaching the `tracing` backend.

use crate::secret_masker::SecretMasker;
use chrono::Utc;
use std::sync::Arc;
use step_sdk::TraceWriter;

/// Trace severity, ordered so a threshold comparison works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceEventType {
    Verbose,
    Information,
    Warning,
    Error,
}

impl std::fmt::Display for TraceEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEventType::Verbose => write!(f, "VERB"),
            TraceEventType::Information => write!(f, "INFO"),
            TraceEventType::Warning => write!(f, "WARN"),
            TraceEventType::Error => write!(f, "ERR "),
        }
    }
}

/// Configuration for trace output.
#[derive(Debug, Clone)]
pub struct TraceSetting {
    /// Minimum severity to emit.
    pub level: TraceEventType,
}

impl Default for TraceSetting {
    fn default() -> Self {
        Self {
            level: TraceEventType::Verbose,
        }
    }
}

/// A named trace source that masks secrets before emitting.
///
/// Each component gets its own `Tracing` with a distinct name; all of them
/// share one `SecretMasker`.
#[derive(Clone)]
pub struct Tracing {
    name: String,
    secret_masker: Arc<SecretMasker>,
    setting: TraceSetting,
}

impl Tracing {
    pub fn new(
        name: impl Into<String>,
        secret_masker: Arc<SecretMasker>,
        setting: TraceSetting,
    ) -> Self {
        Self {
            name: name.into(),
            secret_masker,
            setting,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log the full source chain of an error at error level.
    pub fn error_chain(&self, err: &dyn std::error::Error) {
        self.error(&err.to_string());
        let mut source = err.source();
        while let Some(cause) = source {
            self.error(&format!("  caused by: {cause}"));
            source = cause.source();
        }
    }

    fn emit(&self, event_type: TraceEventType, message: &str) {
        if event_type < self.setting.level {
            return;
        }

        let masked = self.secret_masker.mask(message);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let formatted = format!("[{timestamp}][{}] {event_type}: {masked}", self.name);

        match event_type {
            TraceEventType::Error => tracing::error!("{}", formatted),
            TraceEventType::Warning => tracing::warn!("{}", formatted),
            TraceEventType::Information => tracing::info!("{}", formatted),
            TraceEventType::Verbose => tracing::debug!("{}", formatted),
        }
    }
}

impl TraceWriter for Tracing {
    fn info(&self, message: &str) {
        self.emit(TraceEventType::Information, message);
    }

    fn verbose(&self, message: &str) {
        self.emit(TraceEventType::Verbose, message);
    }

    fn warning(&self, message: &str) {
        self.emit(TraceEventType::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(TraceEventType::Error, message);
    }
}

/// Factory for per-component trace sources sharing one masker.
pub struct TraceManager {
    secret_masker: Arc<SecretMasker>,
    default_setting: TraceSetting,
}

impl TraceManager {
    pub fn new(secret_masker: Arc<SecretMasker>) -> Self {
        Self {
            secret_masker,
            default_setting: TraceSetting::default(),
        }
    }

    pub fn with_setting(secret_masker: Arc<SecretMasker>, setting: TraceSetting) -> Self {
        Self {
            secret_masker,
            default_setting: setting,
        }
    }

    /// Create a trace source for the named component.
    pub fn get(&self, name: &str) -> Tracing {
        Tracing::new(
            name,
            self.secret_masker.clone(),
            self.default_setting.clone(),
        )
    }

    pub fn secret_masker(&self) -> &Arc<SecretMasker> {
        &self.secret_masker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_supports_thresholds() {
        assert!(TraceEventType::Verbose < TraceEventType::Information);
        assert!(TraceEventType::Information < TraceEventType::Warning);
        assert!(TraceEventType::Warning < TraceEventType::Error);
    }

    #[test]
    fn manager_hands_out_named_sources() {
        let manager = TraceManager::new(Arc::new(SecretMasker::new()));
        let trace = manager.get("Resolver");
        assert_eq!(trace.name(), "Resolver");
    }
}
