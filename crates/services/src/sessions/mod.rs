//! Exam session orchestration: the in-memory session facade plus the
//! controllers that drive it (countdown timer, autosave, submission) and the
//! runtime that wires them together.

pub mod autosave;
pub mod progress;
pub mod service;
pub mod submit;
pub mod timer;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use autosave::{AutosaveConfig, AutosaveController, SaveOutcome};
pub use progress::ExamStatistics;
pub use service::ExamSessionService;
pub use submit::{RetryPolicy, SubmissionController, SubmitOutcome, SubmitStatus};
pub use timer::{ExamTimer, TickOutcome, TimeAlert};
pub use workflow::ExamRuntime;
