use chrono::{DateTime, Utc};

use crate::action::ExamAction;
use crate::model::{Answer, QuestionId};
use crate::pause::{self, PauseDecision, PauseSource};
use crate::state::ExamState;

/// Apply one action to the state. Pure except for the timestamps the caller
/// baked into the action; no I/O, no clock reads, fully replayable.
///
/// Illegal preconditions (next at the last question, jump out of range) are
/// no-ops rather than errors: they arise from UI races such as double-clicks
/// and must not tear the state.
pub fn transition(state: &mut ExamState, question_count: usize, action: ExamAction) {
    match action {
        ExamAction::SelectAnswer {
            question_id,
            option_id,
            at,
        } => select_answer(state, question_id, option_id, at),

        ExamAction::NextQuestion {
            question_id,
            elapsed_secs,
            at,
        } => {
            if state.current_question_index + 1 >= question_count {
                return;
            }
            accrue(state, question_id, elapsed_secs, at);
            state.current_question_index += 1;
            open_fresh_window(state, at);
        }

        ExamAction::PreviousQuestion {
            question_id,
            elapsed_secs,
            at,
        } => {
            if state.current_question_index == 0 {
                return;
            }
            accrue(state, question_id, elapsed_secs, at);
            state.current_question_index -= 1;
            open_fresh_window(state, at);
        }

        ExamAction::ToggleMark { question_id } => toggle_mark(state, question_id),

        ExamAction::SetQuestion {
            index,
            question_id,
            elapsed_secs,
            at,
        } => {
            if index >= question_count {
                return;
            }
            accrue(state, question_id, elapsed_secs, at);
            state.current_question_index = index;
            open_fresh_window(state, at);
        }

        ExamAction::ClearAnswer { question_id } => {
            // Marked-set membership is deliberately untouched.
            state.answers.remove(&question_id);
        }

        ExamAction::SetPause {
            request,
            requester,
            current_question_id,
            at,
        } => set_pause(state, request, requester, current_question_id, at),

        ExamAction::DecrementTime => {
            state.remaining_secs = state.remaining_secs.saturating_sub(1);
            if state.remaining_secs == 0 {
                // Time-up is terminal: freeze the session.
                state.is_paused = true;
            }
        }

        ExamAction::UpdateSnapshot { fingerprint } => {
            state.last_saved_snapshot = Some(fingerprint);
        }
    }
}

/// Flush elapsed seconds into the question's answer record and the session
/// total. Creates a selection-less record when time was spent on an
/// unanswered question.
fn accrue(state: &mut ExamState, question_id: QuestionId, elapsed_secs: u32, at: DateTime<Utc>) {
    if let Some(answer) = state.answers.get_mut(&question_id) {
        answer.accrue(elapsed_secs, at);
    } else if elapsed_secs > 0 {
        state
            .answers
            .insert(question_id, Answer::time_only(question_id, elapsed_secs, at));
    }
    state.total_time_spent_secs = state.total_time_spent_secs.saturating_add(elapsed_secs);
}

fn open_fresh_window(state: &mut ExamState, at: DateTime<Utc>) {
    state.question_started_at = at;
    state.is_paused = false;
    state.pause_source = PauseSource::None;
}

fn select_answer(state: &mut ExamState, question_id: QuestionId, option_id: String, at: DateTime<Utc>) {
    let (time_spent_secs, marked_for_review) = state
        .answers
        .get(&question_id)
        .map_or((0, false), |a| (a.time_spent_secs, a.marked_for_review));

    state.answers.insert(
        question_id,
        Answer {
            question_id,
            selected_option: Some(option_id),
            time_spent_secs,
            marked_for_review,
            updated_at: at,
        },
    );

    // Selecting acts as an implicit resume; the timing window restarts so the
    // paused interval never accrues.
    if state.is_paused {
        state.question_started_at = at;
    }
    state.is_paused = false;
    state.pause_source = PauseSource::None;
}

fn toggle_mark(state: &mut ExamState, question_id: QuestionId) {
    if !state.marked_questions.remove(&question_id) {
        state.marked_questions.insert(question_id);
    }
    // Keep the per-answer flag in sync when a record exists; marking an
    // unanswered question only touches the set.
    if let Some(answer) = state.answers.get_mut(&question_id) {
        answer.marked_for_review = !answer.marked_for_review;
    }
}

fn set_pause(
    state: &mut ExamState,
    request: pause::PauseRequest,
    requester: pause::Requester,
    current_question_id: Option<QuestionId>,
    at: DateTime<Utc>,
) {
    match pause::arbitrate(state.is_paused, state.pause_source, request, requester) {
        PauseDecision::EnterPause(source) => {
            // Flush time spent on the current question so resuming opens a
            // fresh window.
            if let Some(question_id) = current_question_id {
                let elapsed = state.elapsed_on_current(at);
                accrue(state, question_id, elapsed, at);
            }
            state.is_paused = true;
            state.pause_source = source;
            state.question_started_at = at;
        }
        PauseDecision::ExitPause => {
            state.is_paused = false;
            state.pause_source = PauseSource::None;
            state.question_started_at = at;
        }
        PauseDecision::NoChange => {}
    }
}
