//! Graphics error types.

use std::time::Duration;

use thiserror::Error;

use crate::resource::ResourceId;

/// Errors raised while creating or using GPU-backed objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The resource manager refused to create an object.
    #[error("failed to create {kind}: {reason}")]
    CreationFailed {
        /// Kind of object, e.g. "render target".
        kind: &'static str,
        /// Backend-provided reason.
        reason: String,
    },
    /// A handle did not refer to a live object.
    #[error("invalid {kind} handle {index}")]
    InvalidHandle {
        /// Kind of object the handle was supposed to refer to.
        kind: &'static str,
        /// Raw handle index.
        index: u32,
    },
    /// A pixel format is not usable for the requested purpose.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The resource's own initialization code failed.
    #[error("{0}")]
    Init(String),
}

/// Convenience alias for results of resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors returned by the concurrent resource loader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A record's initialization failed; the record is now in the failed state.
    #[error("resource {id} ({description}) failed to initialize: {source}")]
    InitFailed {
        /// Identifier of the failed record.
        id: ResourceId,
        /// Human-readable description of the failed record.
        description: String,
        /// Underlying error.
        source: ResourceError,
    },
    /// Loading did not converge before the configured deadline.
    #[error("resource loading timed out after {elapsed:?} with {} record(s) pending", .pending.len())]
    Timeout {
        /// Time spent by the worker that gave up.
        elapsed: Duration,
        /// Descriptions of the records that were still not ready.
        pending: Vec<String>,
    },
    /// Loading was cancelled before it completed.
    #[error("resource loading cancelled")]
    Cancelled,
    /// The one-time finalization step failed.
    #[error("resource finalization failed: {0}")]
    Finalization(ResourceError),
    /// The one-time finalization step panicked. It is not retried.
    #[error("resource finalization panicked on loader thread {thread_id}")]
    FinalizerPanicked {
        /// Index of the worker that ran the step.
        thread_id: usize,
    },
    /// A worker thread could not be spawned.
    #[error("failed to spawn loader thread: {0}")]
    Spawn(String),
    /// A worker thread panicked.
    #[error("loader thread {thread_id} panicked")]
    WorkerPanicked {
        /// Index of the worker that panicked.
        thread_id: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResourceError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = ResourceError::CreationFailed {
            kind: "texture",
            reason: "zero extent".to_string(),
        };
        assert_eq!(err.to_string(), "failed to create texture: zero extent");
    }

    #[test]
    fn test_timeout_display_counts_pending() {
        let err = LoadError::Timeout {
            elapsed: Duration::from_millis(250),
            pending: vec!["Texture 7".into(), "Shader 2".into()],
        };
        assert_eq!(
            err.to_string(),
            "resource loading timed out after 250ms with 2 record(s) pending"
        );
    }

    #[test]
    fn test_init_failed_display() {
        let err = LoadError::InitFailed {
            id: ResourceId(3),
            description: "sponza.obj".into(),
            source: ResourceError::Init("file not found".into()),
        };
        assert_eq!(
            err.to_string(),
            "resource #3 (sponza.obj) failed to initialize: file not found"
        );
    }
}
