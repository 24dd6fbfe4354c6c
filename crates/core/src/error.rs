use thiserror::Error;

/// Errors raised while constructing exam state from a server payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamStateError {
    #[error("resume payload contains no questions")]
    NoQuestions,
}
