//! Fixture builders shared by the session unit tests.

use exam_core::model::{CategoryId, ExamSession, Question, QuestionId, SessionId};
use exam_core::time::fixed_now;

use crate::api::ResumedExam;

#[must_use]
pub fn question(id: u64, number: u32) -> Question {
    Question {
        id: QuestionId::new(id),
        question_number: number,
        question_text: format!("Question {number}"),
        choice_a: "A".into(),
        choice_b: "B".into(),
        choice_c: "C".into(),
        choice_d: "D".into(),
        category_id: CategoryId::new(1),
        category_name: "General".into(),
        user_answer: None,
        time_spent: 0,
        marked_for_review: false,
        first_viewed_at: None,
        answered_at: None,
    }
}

#[must_use]
pub fn resumed_exam(question_count: u64, exam_duration: u32) -> ResumedExam {
    resumed_exam_with(question_count, exam_duration, |_| {})
}

#[must_use]
pub fn resumed_exam_with(
    question_count: u64,
    exam_duration: u32,
    tweak: impl FnOnce(&mut Vec<Question>),
) -> ResumedExam {
    let mut questions: Vec<Question> = (1..=question_count)
        .map(|id| question(id, u32::try_from(id).unwrap_or(u32::MAX)))
        .collect();
    tweak(&mut questions);

    let session = ExamSession {
        session_id: SessionId::new("session-1"),
        status: "in_progress".into(),
        started_at: fixed_now(),
        completed_at: None,
        total_time_spent: 0,
        exam_duration,
        remaining_time: exam_duration,
        current_question_number: 1,
        total_questions: u32::try_from(question_count).unwrap_or(u32::MAX),
        score: None,
        correct_answers: 0,
        progress_percentage: 0.0,
    };

    ResumedExam { session, questions }
}
