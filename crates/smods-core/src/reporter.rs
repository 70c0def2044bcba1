//! Reporter trait for dependency injection
//!
//! Lets the pipeline report progress without being coupled to a particular
//! terminal front end.

use crate::pipeline::RunState;

/// Sink for user-facing progress.
pub trait Reporter: Send + Sync {
    /// A new stage has started (e.g. "Extracting", "Patching").
    fn section(&self, title: &str);

    /// The run moved to `state`.
    fn state(&self, state: RunState);

    /// Per-file detail, shown only in verbose mode.
    fn detail(&self, msg: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn state(&self, state: RunState) {
        (**self).state(state);
    }
    fn detail(&self, msg: &str) {
        (**self).detail(msg);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn state(&self, _: RunState) {}
    fn detail(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
