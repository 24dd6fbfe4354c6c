use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::state::ExamState;

/// Opaque change-detection token for persisted progress.
///
/// A canonical serialization of (answer entries, marked ids, current index).
/// Compared by equality only and never transmitted. Volatile per-answer
/// timestamps are excluded so re-selecting the same option does not produce a
/// spurious difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Derive the fingerprint for the given state. Deterministic: the answer map
/// and marked set iterate in key order, so equal states always produce equal
/// fingerprints.
#[must_use]
pub fn fingerprint(state: &ExamState) -> Fingerprint {
    let mut out = String::new();
    let _ = write!(out, "i={};m=", state.current_question_index);
    for (pos, id) in state.marked_questions.iter().enumerate() {
        if pos > 0 {
            out.push(',');
        }
        let _ = write!(out, "{id}");
    }
    out.push_str(";a=");
    for (pos, (id, answer)) in state.answers.iter().enumerate() {
        if pos > 0 {
            out.push('|');
        }
        let _ = write!(
            out,
            "{id}:{}:{}:{}",
            answer.selected_option.as_deref().unwrap_or(""),
            answer.time_spent_secs,
            answer.marked_for_review,
        );
    }
    Fingerprint(out)
}

/// Wire shape for autosave and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub total_time_spent: u32,
    /// 1-based, matching the server's numbering.
    pub current_question_number: u32,
    pub answers: Vec<AnswerPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub question_id: String,
    pub user_answer: String,
    pub time_spent: u32,
    pub marked_for_review: bool,
}

/// Build the progress payload for persistence.
///
/// Selection-less records (pure time-on-page tracking) are filtered out of the
/// answer list but still counted in total time. Total time is derived from the
/// countdown (`exam_duration - remaining`) so there is a single authoritative
/// time accounting scheme.
#[must_use]
pub fn progress_payload(state: &ExamState, exam_duration_secs: u32) -> ProgressPayload {
    let answers = state
        .answers
        .values()
        .filter_map(|answer| {
            let user_answer = answer.selected_option.clone()?;
            Some(AnswerPayload {
                question_id: answer.question_id.to_string(),
                user_answer,
                time_spent: answer.time_spent_secs,
                marked_for_review: state.is_marked(answer.question_id),
            })
        })
        .collect();

    ProgressPayload {
        total_time_spent: exam_duration_secs.saturating_sub(state.remaining_secs),
        current_question_number: u32::try_from(state.current_question_index).unwrap_or(u32::MAX)
            .saturating_add(1),
        answers,
    }
}
