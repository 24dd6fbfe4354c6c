use exam_core::action::ExamAction;
use exam_core::engine::transition;
use exam_core::model::{Answer, Question, QuestionId, SessionId};
use exam_core::pause::{PauseRequest, Requester};
use exam_core::snapshot::{self, Fingerprint, ProgressPayload};
use exam_core::state::ExamState;
use exam_core::time::Clock;
use exam_core::ExamSession;

use crate::api::{CategoryChange, ResumedExam};
use crate::error::SessionError;
use crate::sessions::progress::ExamStatistics;

/// In-memory exam session: the session record, the question list, and the
/// canonical [`ExamState`], mutated only through dispatched actions.
///
/// The facade computes elapsed wall-clock time for navigation and pause
/// actions; the elapsed value is forced to zero while paused so a paused
/// interval never accrues against exam time.
#[derive(Debug)]
pub struct ExamSessionService {
    session_id: SessionId,
    session: ExamSession,
    questions: Vec<Question>,
    state: ExamState,
    clock: Clock,
}

impl ExamSessionService {
    /// Build a session from a server start/resume payload.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingSessionId` for a payload without a usable
    /// session identifier, and propagates state-restore failures.
    pub fn resume(payload: ResumedExam, clock: Clock) -> Result<Self, SessionError> {
        let ResumedExam { session, questions } = payload;
        if session.session_id.is_blank() {
            return Err(SessionError::MissingSessionId);
        }

        let state = ExamState::restore(&session, &questions, clock.now())?;
        Ok(Self {
            session_id: session.session_id.clone(),
            session,
            questions,
            state,
            clock,
        })
    }

    fn dispatch(&mut self, action: ExamAction) {
        transition(&mut self.state, self.questions.len(), action);
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> &ExamState {
        &self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.state.current_question_index)
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<&Answer> {
        let question = self.current_question()?;
        self.state.answer(question.id)
    }

    #[must_use]
    pub fn is_current_marked(&self) -> bool {
        self.current_question()
            .is_some_and(|question| self.state.is_marked(question.id))
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    #[must_use]
    pub fn is_time_up(&self) -> bool {
        self.state.is_time_up()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.state.remaining_secs
    }

    /// Current wall-clock time as this session sees it.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn statistics(&self) -> ExamStatistics {
        ExamStatistics::derive(&self.state, self.questions.len())
    }

    #[must_use]
    pub fn progress_payload(&self) -> ProgressPayload {
        snapshot::progress_payload(&self.state, self.session.exam_duration)
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        snapshot::fingerprint(&self.state)
    }

    /// Whether current progress differs from the last persisted snapshot.
    #[must_use]
    pub fn needs_save(&self) -> bool {
        self.state.last_saved_snapshot.as_ref() != Some(&self.fingerprint())
    }

    //
    // ─── NAVIGATION & ANSWERS ──────────────────────────────────────────────
    //

    /// Record a selection for the current question. No-op when the question
    /// list is empty.
    pub fn select_answer(&mut self, option_id: impl Into<String>) {
        let Some(question) = self.current_question() else {
            return;
        };
        let action = ExamAction::SelectAnswer {
            question_id: question.id,
            option_id: option_id.into(),
            at: self.clock.now(),
        };
        self.dispatch(action);
    }

    pub fn next_question(&mut self) {
        // Guarded here as well as in the engine: a double-click at the last
        // question must not accrue time twice.
        if self.state.current_question_index + 1 >= self.questions.len() {
            return;
        }
        let Some((question_id, elapsed_secs, at)) = self.elapsed_for_navigation() else {
            return;
        };
        self.dispatch(ExamAction::NextQuestion {
            question_id,
            elapsed_secs,
            at,
        });
    }

    pub fn previous_question(&mut self) {
        if self.state.current_question_index == 0 {
            return;
        }
        let Some((question_id, elapsed_secs, at)) = self.elapsed_for_navigation() else {
            return;
        };
        self.dispatch(ExamAction::PreviousQuestion {
            question_id,
            elapsed_secs,
            at,
        });
    }

    /// Jump directly to a 0-based question index (review navigation).
    pub fn go_to_question(&mut self, index: usize) {
        if index >= self.questions.len() {
            return;
        }
        let Some((question_id, elapsed_secs, at)) = self.elapsed_for_navigation() else {
            return;
        };
        self.dispatch(ExamAction::SetQuestion {
            index,
            question_id,
            elapsed_secs,
            at,
        });
    }

    fn elapsed_for_navigation(&self) -> Option<(QuestionId, u32, chrono::DateTime<chrono::Utc>)> {
        let question = self.current_question()?;
        let at = self.clock.now();
        Some((question.id, self.state.accruable_elapsed(at), at))
    }

    pub fn toggle_mark(&mut self) {
        let Some(question) = self.current_question() else {
            return;
        };
        let action = ExamAction::ToggleMark {
            question_id: question.id,
        };
        self.dispatch(action);
    }

    pub fn clear_answer(&mut self) {
        let Some(question) = self.current_question() else {
            return;
        };
        let action = ExamAction::ClearAnswer {
            question_id: question.id,
        };
        self.dispatch(action);
    }

    //
    // ─── PAUSE ─────────────────────────────────────────────────────────────
    //

    /// Explicit pause button: flip the paused state, attributed to the user.
    pub fn toggle_pause(&mut self) {
        self.set_pause(PauseRequest::Toggle, Requester::User);
    }

    /// Incidental UI activity opened; stop the clock without claiming a
    /// user pause.
    pub fn pause_for_activity(&mut self) {
        self.set_pause(PauseRequest::Pause, Requester::System);
    }

    /// Incidental UI activity closed. Never cancels a user-owned pause.
    pub fn resume_from_activity(&mut self) {
        self.set_pause(PauseRequest::Resume, Requester::System);
    }

    fn set_pause(&mut self, request: PauseRequest, requester: Requester) {
        let current_question_id = self.current_question().map(|question| question.id);
        let action = ExamAction::SetPause {
            request,
            requester,
            current_question_id,
            at: self.clock.now(),
        };
        self.dispatch(action);
    }

    //
    // ─── TIMER & PERSISTENCE HOOKS ─────────────────────────────────────────
    //

    /// One countdown tick. Driven by the timer controller.
    pub fn decrement_time(&mut self) {
        self.dispatch(ExamAction::DecrementTime);
    }

    /// Record that a payload with this fingerprint was persisted.
    pub fn record_saved(&mut self, fingerprint: Fingerprint) {
        self.dispatch(ExamAction::UpdateSnapshot { fingerprint });
    }

    /// Flush time accrued on the current question without moving. Used right
    /// before submission so the final payload carries the last window.
    pub fn flush_current_elapsed(&mut self) {
        let Some(question) = self.current_question() else {
            return;
        };
        let question_id = question.id;
        let at = self.clock.now();
        let action = ExamAction::SetQuestion {
            index: self.state.current_question_index,
            question_id,
            elapsed_secs: self.state.accruable_elapsed(at),
            at,
        };
        self.dispatch(action);
    }

    /// Patch the local question list after a server-side category change.
    pub fn update_question_category(&mut self, change: &CategoryChange) {
        if let Some(question) = self
            .questions
            .iter_mut()
            .find(|question| question.id == change.question_id)
        {
            question.category_id = change.new_category_id;
            question.category_name = change.new_category.clone();
        }
    }

    #[cfg(test)]
    pub(crate) fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::testing::{resumed_exam, resumed_exam_with};
    use chrono::Duration;
    use exam_core::time::fixed_clock;

    #[test]
    fn resume_rejects_blank_session_id() {
        let mut payload = resumed_exam(3, 3600);
        payload.session.session_id = SessionId::new("   ");
        let err = ExamSessionService::resume(payload, fixed_clock()).unwrap_err();
        assert!(matches!(err, SessionError::MissingSessionId));
    }

    #[test]
    fn resume_rebuilds_current_position_and_answers() {
        let payload = resumed_exam_with(3, 3600, |questions| {
            questions[0].user_answer = Some("a".into());
            questions[0].time_spent = 25;
            questions[1].marked_for_review = true;
        });
        let service = ExamSessionService::resume(payload, fixed_clock()).unwrap();

        assert_eq!(service.question_count(), 3);
        assert_eq!(service.state().answers.len(), 1);
        assert!(service.state().is_marked(QuestionId::new(2)));
    }

    #[test]
    fn navigation_accrues_wall_clock_time() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        service.clock_mut().advance(Duration::seconds(15));
        service.next_question();

        assert_eq!(service.state().current_question_index, 1);
        assert_eq!(service.state().total_time_spent_secs, 15);
        assert_eq!(
            service.state().answer(QuestionId::new(1)).unwrap().time_spent_secs,
            15
        );
    }

    #[test]
    fn paused_navigation_accrues_nothing() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        service.toggle_pause();
        service.clock_mut().advance(Duration::seconds(40));
        service.next_question();

        assert_eq!(service.state().current_question_index, 1);
        assert_eq!(service.state().total_time_spent_secs, 0);
        assert!(!service.is_paused());
    }

    #[test]
    fn select_answer_targets_current_question() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        service.next_question();
        service.select_answer("c");

        let answer = service.current_answer().unwrap();
        assert_eq!(answer.question_id, QuestionId::new(2));
        assert_eq!(answer.selected_option.as_deref(), Some("c"));
    }

    #[test]
    fn toggle_mark_reflects_in_queries() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        assert!(!service.is_current_marked());
        service.toggle_mark();
        assert!(service.is_current_marked());
        service.toggle_mark();
        assert!(!service.is_current_marked());
    }

    #[test]
    fn go_to_question_out_of_range_is_a_no_op() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        service.go_to_question(99);
        assert_eq!(service.state().current_question_index, 0);
    }

    #[test]
    fn flush_current_elapsed_keeps_position() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        service.clock_mut().advance(Duration::seconds(9));
        service.flush_current_elapsed();

        assert_eq!(service.state().current_question_index, 0);
        assert_eq!(service.state().total_time_spent_secs, 9);
    }

    #[test]
    fn needs_save_follows_fingerprint() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        assert!(service.needs_save());

        let fingerprint = service.fingerprint();
        service.record_saved(fingerprint);
        assert!(!service.needs_save());

        service.select_answer("b");
        assert!(service.needs_save());
    }

    #[test]
    fn category_change_patches_question_list() {
        let mut service = ExamSessionService::resume(resumed_exam(3, 3600), fixed_clock()).unwrap();
        let change = CategoryChange {
            message: "updated".into(),
            question_id: QuestionId::new(2),
            old_category: "Anatomy".into(),
            new_category: "Physiology".into(),
            new_category_id: exam_core::model::CategoryId::new(9),
        };
        service.update_question_category(&change);

        let question = &service.questions()[1];
        assert_eq!(question.category_id, exam_core::model::CategoryId::new(9));
        assert_eq!(question.category_name, "Physiology");
    }
}
