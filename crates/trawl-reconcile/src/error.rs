//! Error types for workflows and activities.

use trawl_types::ShardsError;

/// An activity invocation failed.
///
/// Activity failures cross the engine boundary serialized, so this
/// carries the failure as a message rather than a source chain; the
/// message is what the workflow propagates verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ActivityError {
    message: String,
}

impl ActivityError {
    /// Wrap a failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A workflow run failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// The workflow input was illegal; no activity was dispatched.
    #[error("{0}")]
    Validation(String),

    /// An activity returned an error, propagated verbatim. In-memory
    /// partial aggregates are not surfaced alongside it.
    #[error(transparent)]
    Activity(#[from] ActivityError),
}

impl From<ShardsError> for WorkflowError {
    fn from(e: ShardsError) -> Self {
        Self::Validation(e.to_string())
    }
}
