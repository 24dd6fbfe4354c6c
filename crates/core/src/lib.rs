#![forbid(unsafe_code)]

//! Core domain for a timed, resumable multiple-choice exam session: the state
//! model, the pure transition engine, pause arbitration, and the progress
//! payload/fingerprint builders. No I/O lives here.

pub mod action;
pub mod engine;
pub mod error;
pub mod model;
pub mod pause;
pub mod snapshot;
pub mod state;
pub mod time;

pub use action::ExamAction;
pub use error::ExamStateError;
pub use model::{Answer, ExamSession, Question};
pub use pause::{PauseDecision, PauseRequest, PauseSource, Requester};
pub use snapshot::{AnswerPayload, Fingerprint, ProgressPayload};
pub use state::ExamState;
pub use time::Clock;
