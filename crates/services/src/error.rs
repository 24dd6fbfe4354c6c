//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::ExamStateError;
use storage::StorageError;

/// Errors emitted by the exam API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("exam service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while initializing or driving an exam session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("resume payload is missing a valid session id")]
    MissingSessionId,
    #[error("no active session to operate on")]
    NotStarted,
    #[error(transparent)]
    State(#[from] ExamStateError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
