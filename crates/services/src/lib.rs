#![forbid(unsafe_code)]

//! Service layer for timed exam sessions: the remote API contract, the
//! session facade and the background controllers built on top of
//! [`exam_core`]'s pure state engine.

pub mod api;
pub mod error;
pub mod sessions;

pub use api::{
    ActiveSessionCheck, CategoryChange, ExamApi, ExamApiConfig, ExamResult, HttpExamApi,
    ResumedExam,
};
pub use error::{ApiError, SessionError};
pub use sessions::{
    AutosaveConfig, AutosaveController, ExamRuntime, ExamSessionService, ExamStatistics,
    ExamTimer, RetryPolicy, SaveOutcome, SubmissionController, SubmitOutcome, SubmitStatus,
    TickOutcome, TimeAlert,
};
