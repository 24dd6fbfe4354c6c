use exam_core::state::ExamState;

/// Aggregated view of exam progress, useful for UI headers and panels.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamStatistics {
    pub total_questions: usize,
    /// Questions with an actual selection; time-only records do not count.
    pub answered: usize,
    pub marked: usize,
    pub unanswered: usize,
    pub progress_percent: f64,
}

impl ExamStatistics {
    #[must_use]
    pub fn derive(state: &ExamState, total_questions: usize) -> Self {
        let answered = state
            .answers
            .values()
            .filter(|answer| answer.is_answered())
            .count();
        let progress_percent = if total_questions > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                answered as f64 / total_questions as f64 * 100.0
            }
        } else {
            0.0
        };
        Self {
            total_questions,
            answered,
            marked: state.marked_questions.len(),
            unanswered: total_questions.saturating_sub(answered),
            progress_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Answer, QuestionId};
    use exam_core::time::fixed_now;

    #[test]
    fn time_only_records_do_not_count_as_answered() {
        let mut state = ExamState::new(fixed_now(), 600);
        state.answers.insert(
            QuestionId::new(1),
            Answer::time_only(QuestionId::new(1), 30, fixed_now()),
        );
        let mut answered = Answer::time_only(QuestionId::new(2), 10, fixed_now());
        answered.selected_option = Some("a".into());
        state.answers.insert(QuestionId::new(2), answered);
        state.marked_questions.insert(QuestionId::new(3));

        let stats = ExamStatistics::derive(&state, 4);
        assert_eq!(stats.answered, 1);
        assert_eq!(stats.unanswered, 3);
        assert_eq!(stats.marked, 1);
        assert!((stats.progress_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_exam_has_zero_progress() {
        let state = ExamState::new(fixed_now(), 600);
        let stats = ExamStatistics::derive(&state, 0);
        assert_eq!(stats.progress_percent, 0.0);
    }
}
