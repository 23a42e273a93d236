//! Error types and handling
//!
//! Common error types used across the recording core.

use thiserror::Error;

/// Errors that can occur during recording
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("recording is already paused")]
    AlreadyPaused,

    #[error("recording is not paused")]
    NotPaused,

    #[error("start aborted: {0}")]
    Cancelled(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("capture cancelled by user: {0}")]
    UserCancelled(String),

    #[error("capture context unreachable: {0}")]
    ContextUnreachable(String),

    #[error("optional track unavailable: {0}")]
    DegradedTrack(String),

    #[error("no data captured")]
    EmptyArtifact,

    #[error("capture error: {0}")]
    Capture(String),

    #[error("save failed: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
