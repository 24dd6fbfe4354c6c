use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::error::ExamStateError;
use crate::model::{Answer, ExamSession, Question, QuestionId};
use crate::pause::PauseSource;
use crate::snapshot::Fingerprint;

/// Canonical in-memory representation of exam progress.
///
/// Single source of truth for the session: every other component reads it and
/// requests changes exclusively through [`crate::engine::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamState {
    /// 0-based position within the question list. Always `< question_count`.
    pub current_question_index: usize,
    /// Per-question response records, keyed by question id.
    pub answers: BTreeMap<QuestionId, Answer>,
    /// Questions flagged for later review.
    pub marked_questions: BTreeSet<QuestionId>,
    pub is_paused: bool,
    /// Who owns the current pause. `None` whenever `is_paused` is false.
    pub pause_source: PauseSource,
    /// When the clock for the current question began accruing.
    pub question_started_at: DateTime<Utc>,
    /// Seconds accumulated across the whole session. Never decreases.
    pub total_time_spent_secs: u32,
    /// Countdown in seconds. Reaching 0 is a terminal time-up signal.
    pub remaining_secs: u32,
    /// Fingerprint of the last successfully persisted progress payload.
    pub last_saved_snapshot: Option<Fingerprint>,
}

impl ExamState {
    /// Fresh state at the start of a brand-new exam.
    #[must_use]
    pub fn new(now: DateTime<Utc>, remaining_secs: u32) -> Self {
        Self {
            current_question_index: 0,
            answers: BTreeMap::new(),
            marked_questions: BTreeSet::new(),
            is_paused: false,
            pause_source: PauseSource::None,
            question_started_at: now,
            total_time_spent_secs: 0,
            remaining_secs,
            last_saved_snapshot: None,
        }
    }

    /// Rebuild state from a server resume payload, reconstructing answers and
    /// marks from the per-question fields.
    ///
    /// # Errors
    ///
    /// Returns `ExamStateError::NoQuestions` when the payload has no questions
    /// to resume into.
    pub fn restore(
        session: &ExamSession,
        questions: &[Question],
        now: DateTime<Utc>,
    ) -> Result<Self, ExamStateError> {
        if questions.is_empty() {
            return Err(ExamStateError::NoQuestions);
        }

        let mut answers = BTreeMap::new();
        let mut marked_questions = BTreeSet::new();
        for question in questions {
            if let Some(selected) = &question.user_answer {
                answers.insert(
                    question.id,
                    Answer {
                        question_id: question.id,
                        selected_option: Some(selected.clone()),
                        time_spent_secs: question.time_spent,
                        marked_for_review: question.marked_for_review,
                        updated_at: question.answered_at.unwrap_or(now),
                    },
                );
            }
            if question.marked_for_review {
                marked_questions.insert(question.id);
            }
        }

        // The server number is 1-based; clamp defensively into range.
        let index = (session.current_question_number.max(1) as usize - 1)
            .min(questions.len() - 1);

        Ok(Self {
            current_question_index: index,
            answers,
            marked_questions,
            is_paused: false,
            pause_source: PauseSource::None,
            question_started_at: now,
            total_time_spent_secs: session.total_time_spent,
            remaining_secs: session.remaining_time,
            last_saved_snapshot: None,
        })
    }

    /// Whole seconds elapsed on the current question since its window opened.
    /// Clamped to zero for backdated timestamps.
    #[must_use]
    pub fn elapsed_on_current(&self, at: DateTime<Utc>) -> u32 {
        let secs = at
            .signed_duration_since(self.question_started_at)
            .num_seconds();
        u32::try_from(secs).unwrap_or(0)
    }

    /// Elapsed seconds that should accrue on navigation: zero while paused,
    /// wall-clock delta otherwise.
    #[must_use]
    pub fn accruable_elapsed(&self, at: DateTime<Utc>) -> u32 {
        if self.is_paused {
            0
        } else {
            self.elapsed_on_current(at)
        }
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn is_marked(&self, question_id: QuestionId) -> bool {
        self.marked_questions.contains(&question_id)
    }

    /// Time-up terminal condition.
    #[must_use]
    pub fn is_time_up(&self) -> bool {
        self.remaining_secs == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question(id: u64, number: u32, user_answer: Option<&str>, marked: bool) -> Question {
        Question {
            id: QuestionId::new(id),
            question_number: number,
            question_text: String::new(),
            choice_a: String::new(),
            choice_b: String::new(),
            choice_c: String::new(),
            choice_d: String::new(),
            category_id: crate::model::CategoryId::new(1),
            category_name: String::new(),
            user_answer: user_answer.map(str::to_owned),
            time_spent: 30,
            marked_for_review: marked,
            first_viewed_at: None,
            answered_at: None,
        }
    }

    fn session(current_question_number: u32) -> ExamSession {
        ExamSession {
            session_id: crate::model::SessionId::new("s-1"),
            status: "in_progress".into(),
            started_at: fixed_now(),
            completed_at: None,
            total_time_spent: 90,
            exam_duration: 3600,
            remaining_time: 3510,
            current_question_number,
            total_questions: 3,
            score: None,
            correct_answers: 0,
            progress_percentage: 0.0,
        }
    }

    #[test]
    fn restore_rebuilds_answers_and_marks() {
        let questions = vec![
            question(1, 1, Some("b"), false),
            question(2, 2, None, true),
            question(3, 3, None, false),
        ];
        let state = ExamState::restore(&session(2), &questions, fixed_now()).unwrap();

        assert_eq!(state.current_question_index, 1);
        assert_eq!(state.answers.len(), 1);
        let answer = state.answer(QuestionId::new(1)).unwrap();
        assert_eq!(answer.selected_option.as_deref(), Some("b"));
        assert_eq!(answer.time_spent_secs, 30);
        assert!(state.is_marked(QuestionId::new(2)));
        assert_eq!(state.total_time_spent_secs, 90);
        assert_eq!(state.remaining_secs, 3510);
        assert!(!state.is_paused);
        assert_eq!(state.pause_source, PauseSource::None);
    }

    #[test]
    fn restore_clamps_out_of_range_question_number() {
        let questions = vec![question(1, 1, None, false), question(2, 2, None, false)];
        let state = ExamState::restore(&session(9), &questions, fixed_now()).unwrap();
        assert_eq!(state.current_question_index, 1);

        let state = ExamState::restore(&session(0), &questions, fixed_now()).unwrap();
        assert_eq!(state.current_question_index, 0);
    }

    #[test]
    fn restore_rejects_empty_question_list() {
        let err = ExamState::restore(&session(1), &[], fixed_now()).unwrap_err();
        assert_eq!(err, ExamStateError::NoQuestions);
    }

    #[test]
    fn accruable_elapsed_is_zero_while_paused() {
        let mut state = ExamState::new(fixed_now(), 600);
        let later = fixed_now() + chrono::Duration::seconds(42);
        assert_eq!(state.accruable_elapsed(later), 42);

        state.is_paused = true;
        state.pause_source = PauseSource::User;
        assert_eq!(state.accruable_elapsed(later), 0);
    }

    #[test]
    fn elapsed_clamps_backdated_timestamps() {
        let state = ExamState::new(fixed_now(), 600);
        let earlier = fixed_now() - chrono::Duration::seconds(5);
        assert_eq!(state.elapsed_on_current(earlier), 0);
    }
}
