use serde::{Deserialize, Serialize};

/// Attribution of a pause: who owns it and therefore who may lift it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseSource {
    /// Not paused.
    #[default]
    None,
    /// Explicit pause button.
    User,
    /// Incidental UI activity (e.g. an auxiliary panel) that should not eat
    /// exam time but must not be mistaken for a deliberate pause.
    System,
}

/// What a pause action asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseRequest {
    Pause,
    Resume,
    Toggle,
}

/// Who is asking. `PauseSource::None` never requests anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    User,
    System,
}

impl Requester {
    #[must_use]
    pub fn as_source(self) -> PauseSource {
        match self {
            Requester::User => PauseSource::User,
            Requester::System => PauseSource::System,
        }
    }
}

/// Outcome of arbitrating a pause request against the current pause state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseDecision {
    /// Transition into pause, owned by the given source.
    EnterPause(PauseSource),
    /// Transition out of pause.
    ExitPause,
    /// Illegal or redundant request; state unchanged.
    NoChange,
}

/// Resolve a pause request from one of the two producers.
///
/// Rules:
/// - Pausing always succeeds; a second pause with a different source does not
///   steal ownership from the original pauser.
/// - A resume succeeds only if the requester may cancel the current pause: a
///   system resume never cancels a user pause, a user resume always wins.
/// - Illegal resumes are no-ops.
#[must_use]
pub fn arbitrate(
    is_paused: bool,
    current_source: PauseSource,
    request: PauseRequest,
    requester: Requester,
) -> PauseDecision {
    let wants_pause = match request {
        PauseRequest::Pause => true,
        PauseRequest::Resume => false,
        PauseRequest::Toggle => !is_paused,
    };

    if wants_pause {
        if is_paused {
            // Already paused; the original source keeps ownership.
            return PauseDecision::NoChange;
        }
        return PauseDecision::EnterPause(requester.as_source());
    }

    if !is_paused {
        return PauseDecision::NoChange;
    }

    match requester {
        Requester::User => PauseDecision::ExitPause,
        Requester::System => {
            if current_source == PauseSource::System {
                PauseDecision::ExitPause
            } else {
                PauseDecision::NoChange
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_pause_is_not_cancelled_by_system_resume() {
        let decision = arbitrate(
            true,
            PauseSource::User,
            PauseRequest::Resume,
            Requester::System,
        );
        assert_eq!(decision, PauseDecision::NoChange);
    }

    #[test]
    fn system_pause_resumes_symmetrically() {
        let enter = arbitrate(
            false,
            PauseSource::None,
            PauseRequest::Pause,
            Requester::System,
        );
        assert_eq!(enter, PauseDecision::EnterPause(PauseSource::System));

        let exit = arbitrate(
            true,
            PauseSource::System,
            PauseRequest::Resume,
            Requester::System,
        );
        assert_eq!(exit, PauseDecision::ExitPause);
    }

    #[test]
    fn user_resume_always_wins() {
        let decision = arbitrate(
            true,
            PauseSource::System,
            PauseRequest::Resume,
            Requester::User,
        );
        assert_eq!(decision, PauseDecision::ExitPause);
    }

    #[test]
    fn second_pause_does_not_steal_ownership() {
        let decision = arbitrate(
            true,
            PauseSource::User,
            PauseRequest::Pause,
            Requester::System,
        );
        assert_eq!(decision, PauseDecision::NoChange);
    }

    #[test]
    fn toggle_flips_current_state() {
        assert_eq!(
            arbitrate(
                false,
                PauseSource::None,
                PauseRequest::Toggle,
                Requester::User
            ),
            PauseDecision::EnterPause(PauseSource::User)
        );
        assert_eq!(
            arbitrate(
                true,
                PauseSource::User,
                PauseRequest::Toggle,
                Requester::User
            ),
            PauseDecision::ExitPause
        );
    }
}
