use chrono::{DateTime, Utc};

use crate::model::ids::QuestionId;

/// A per-question response record: selection, accumulated time, review flag.
///
/// Created on first navigation away from a question or on selection, replaced
/// wholesale on later writes, and removed only by an explicit clear-answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question_id: QuestionId,
    /// Chosen option key (e.g. `"b"`); `None` for a record that only tracks
    /// time spent on an unanswered question.
    pub selected_option: Option<String>,
    /// Seconds accrued while this question was active. Never decreases.
    pub time_spent_secs: u32,
    pub marked_for_review: bool,
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    /// A selection-less record used to accrue time on an unanswered question.
    #[must_use]
    pub fn time_only(question_id: QuestionId, elapsed_secs: u32, at: DateTime<Utc>) -> Self {
        Self {
            question_id,
            selected_option: None,
            time_spent_secs: elapsed_secs,
            marked_for_review: false,
            updated_at: at,
        }
    }

    /// Whether this record carries an actual selection. Time-only records are
    /// excluded from saved/submitted answer lists.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected_option.is_some()
    }

    /// Add elapsed seconds to this record's active time.
    pub fn accrue(&mut self, elapsed_secs: u32, at: DateTime<Utc>) {
        self.time_spent_secs = self.time_spent_secs.saturating_add(elapsed_secs);
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn accrue_never_decreases_time() {
        let now = fixed_now();
        let mut answer = Answer::time_only(QuestionId::new(1), 10, now);
        answer.accrue(0, now);
        assert_eq!(answer.time_spent_secs, 10);
        answer.accrue(u32::MAX, now);
        assert_eq!(answer.time_spent_secs, u32::MAX);
    }

    #[test]
    fn time_only_records_are_not_answered() {
        let answer = Answer::time_only(QuestionId::new(7), 3, fixed_now());
        assert!(!answer.is_answered());
    }
}
