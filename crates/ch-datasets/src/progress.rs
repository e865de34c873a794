//! Caller-supplied progress reporting.

use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Callback receiving human-readable progress messages.
pub type ProgressFn = dyn Fn(&str) + Send + Sync;

/// Optional progress sink. Every message is also logged at `info`.
#[derive(Clone, Default)]
pub struct Progress {
    sink: Option<Arc<ProgressFn>>,
}

impl Progress {
    /// Report progress through `sink`.
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// No sink; messages only reach the log.
    pub fn none() -> Self {
        Self { sink: None }
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Send a message to the sink (if any) and the log.
    pub fn report(&self, message: &str) {
        if let Some(sink) = &self.sink {
            sink(message);
        }
        info!("{}", message);
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("attached", &self.is_attached())
            .finish()
    }
}
