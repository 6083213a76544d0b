//! Injected logging.
//!
//! Components that report retries or suspicious input take a [`NotaryLog`]
//! instead of reaching for a global logger. [`TracingLog`] forwards to
//! `tracing`; tests swap in a recorder.

use std::sync::Arc;

/// Sink for operational messages.
pub trait NotaryLog: Send + Sync {
    fn debug(&self, _message: &str) {}

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

/// Forwards to the `tracing` macros under the `ledger_notary` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl NotaryLog for TracingLog {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "ledger_notary", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "ledger_notary", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "ledger_notary", "{}", message);
    }
}

/// shared handle to a log sink
pub type SharedLog = Arc<dyn NotaryLog>;

/// the default sink
pub fn default_log() -> SharedLog {
    Arc::new(TracingLog)
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::NotaryLog;

    /// Keeps every message with its level.
    #[derive(Default)]
    pub struct RecordingLog {
        pub lines: Mutex<Vec<(&'static str, String)>>,
    }

    impl RecordingLog {
        pub fn at(&self, level: &str) -> Vec<String> {
            self.lines
                .lock()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    impl NotaryLog for RecordingLog {
        fn debug(&self, message: &str) {
            self.lines.lock().push(("debug", message.to_string()));
        }

        fn warn(&self, message: &str) {
            self.lines.lock().push(("warn", message.to_string()));
        }

        fn error(&self, message: &str) {
            self.lines.lock().push(("error", message.to_string()));
        }
    }
}
