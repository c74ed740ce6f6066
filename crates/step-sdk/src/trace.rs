/// Lightweight diagnostic output abstraction.
///
/// Components take a `TraceWriter` instead of logging directly so that the
/// host can route diagnostics wherever it likes (the `tracing` crate, a
/// build log, or nowhere at all in tests).
pub trait TraceWriter: Send + Sync {
    fn info(&self, message: &str);
    fn verbose(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Routes trace output to the `tracing` crate at matching levels.
#[derive(Debug, Clone)]
pub struct TracingTraceWriter;

impl TraceWriter for TracingTraceWriter {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Discards all messages. Useful for tests.
#[derive(Debug, Clone)]
pub struct NullTraceWriter;

impl TraceWriter for NullTraceWriter {
    fn info(&self, _message: &str) {}
    fn verbose(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Severity of a collected trace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Verbose,
    Info,
    Warning,
    Error,
}

/// Collects all messages into a `Vec` for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingTraceWriter {
    messages: parking_lot::Mutex<Vec<(TraceLevel, String)>>,
}

impl CollectingTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected messages, in arrival order.
    pub fn messages(&self) -> Vec<(TraceLevel, String)> {
        self.messages.lock().clone()
    }

    /// Messages at one level only.
    pub fn messages_at(&self, level: TraceLevel) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl TraceWriter for CollectingTraceWriter {
    fn info(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Info, message.to_string()));
    }

    fn verbose(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Verbose, message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Warning, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .lock()
            .push((TraceLevel::Error, message.to_string()));
    }
}
