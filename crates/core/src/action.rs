use chrono::{DateTime, Utc};

use crate::model::QuestionId;
use crate::pause::{PauseRequest, Requester};
use crate::snapshot::Fingerprint;

/// Closed set of state transitions. Every mutation of [`crate::ExamState`]
/// goes through exactly one of these variants.
///
/// Navigation actions carry their own `elapsed_secs`, computed by the caller
/// from wall-clock deltas (and forced to zero while paused). Timestamps are
/// likewise supplied by the caller so the engine stays pure and replayable.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamAction {
    SelectAnswer {
        question_id: QuestionId,
        option_id: String,
        at: DateTime<Utc>,
    },
    NextQuestion {
        question_id: QuestionId,
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    PreviousQuestion {
        question_id: QuestionId,
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    ToggleMark {
        question_id: QuestionId,
    },
    SetQuestion {
        index: usize,
        question_id: QuestionId,
        elapsed_secs: u32,
        at: DateTime<Utc>,
    },
    ClearAnswer {
        question_id: QuestionId,
    },
    SetPause {
        request: PauseRequest,
        requester: Requester,
        current_question_id: Option<QuestionId>,
        at: DateTime<Utc>,
    },
    DecrementTime,
    UpdateSnapshot {
        fingerprint: Fingerprint,
    },
}
