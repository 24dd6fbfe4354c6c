use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use exam_core::ProgressPayload;
use exam_core::model::SessionId;

use crate::api::{ExamApi, ExamResult};

/// Bounded retry/backoff policy for the terminal submission call. Applies to
/// submission only, never to navigation or autosave.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base delay doubling per attempt, capped.
    #[must_use]
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Observable submission state, for UI status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Idle,
    Submitting { attempt: u32 },
    Success,
    Error { attempts: u32 },
}

/// Result of a `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// This call drove the submission to success.
    Submitted { result: ExamResult, retries: u32 },
    /// A previous call already succeeded; cached result, no network.
    AlreadySubmitted(ExamResult),
    /// Another call is mid-flight; no second request was issued.
    AlreadyInFlight,
    /// All attempts failed. A later `submit` starts over.
    Failed { attempts: u32 },
}

enum Phase {
    Idle,
    InFlight { attempt: u32 },
    Succeeded { result: ExamResult, retries: u32 },
    Failed { attempts: u32 },
}

struct Inner {
    session_id: Option<SessionId>,
    phase: Phase,
}

/// Drives the terminal submit-exam operation with exactly-once semantics:
/// at most one request in flight, success cached per session, bounded
/// retries with exponential backoff.
///
/// Once started, a submission runs to success or retry exhaustion; user
/// action cannot interrupt it. Only a session switch resets the bookkeeping.
#[derive(Clone)]
pub struct SubmissionController {
    api: Arc<dyn ExamApi>,
    policy: RetryPolicy,
    inner: Arc<Mutex<Inner>>,
}

impl SubmissionController {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            inner: Arc::new(Mutex::new(Inner {
                session_id: None,
                phase: Phase::Idle,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The lock is only held for field updates, never across awaits, so
        // poisoning can only follow a panic elsewhere in this module.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Point the controller at a session, dropping any bookkeeping that
    /// belongs to a different one. A stale "already submitted" flag must not
    /// leak across sessions.
    pub fn reset_for_session(&self, session_id: &SessionId) {
        let mut inner = self.lock();
        if inner.session_id.as_ref() != Some(session_id) {
            inner.session_id = Some(session_id.clone());
            inner.phase = Phase::Idle;
        }
    }

    #[must_use]
    pub fn status(&self) -> SubmitStatus {
        match &self.lock().phase {
            Phase::Idle => SubmitStatus::Idle,
            Phase::InFlight { attempt } => SubmitStatus::Submitting { attempt: *attempt },
            Phase::Succeeded { .. } => SubmitStatus::Success,
            Phase::Failed { attempts } => SubmitStatus::Error { attempts: *attempts },
        }
    }

    /// Retries consumed by the current or last submission.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        match &self.lock().phase {
            Phase::Idle => 0,
            Phase::InFlight { attempt } => *attempt,
            Phase::Succeeded { retries, .. } => *retries,
            Phase::Failed { attempts } => attempts.saturating_sub(1),
        }
    }

    /// Submit the exam. Guards against double submission from races between
    /// timer expiry and a manual click: concurrent calls collapse into one
    /// network request, and calls after success return the cached result.
    pub async fn submit(
        &self,
        session_id: &SessionId,
        payload: &ProgressPayload,
    ) -> SubmitOutcome {
        self.reset_for_session(session_id);
        {
            let mut inner = self.lock();
            match &inner.phase {
                Phase::Succeeded { result, .. } => {
                    return SubmitOutcome::AlreadySubmitted(result.clone());
                }
                Phase::InFlight { .. } => return SubmitOutcome::AlreadyInFlight,
                Phase::Idle | Phase::Failed { .. } => {
                    inner.phase = Phase::InFlight { attempt: 0 };
                }
            }
        }

        let mut attempt = 0_u32;
        loop {
            match self.api.submit_exam(session_id, payload).await {
                Ok(result) => {
                    tracing::info!(session = %session_id, retries = attempt, "exam submitted");
                    let mut inner = self.lock();
                    // A session switch mid-flight means this result belongs
                    // to a session nobody is tracking anymore.
                    if inner.session_id.as_ref() == Some(session_id) {
                        inner.phase = Phase::Succeeded {
                            result: result.clone(),
                            retries: attempt,
                        };
                    }
                    return SubmitOutcome::Submitted {
                        result,
                        retries: attempt,
                    };
                }
                Err(error) => {
                    let attempts_made = attempt + 1;
                    if attempt >= self.policy.max_retries {
                        tracing::warn!(
                            session = %session_id,
                            attempts = attempts_made,
                            %error,
                            "submission failed; retries exhausted"
                        );
                        let mut inner = self.lock();
                        if inner.session_id.as_ref() == Some(session_id) {
                            inner.phase = Phase::Failed {
                                attempts: attempts_made,
                            };
                        }
                        return SubmitOutcome::Failed {
                            attempts: attempts_made,
                        };
                    }

                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        session = %session_id,
                        attempt = attempts_made,
                        retry_in_secs = delay.as_secs(),
                        %error,
                        "submission attempt failed; retrying"
                    );
                    tokio::time::sleep(delay).await;

                    attempt += 1;
                    let mut inner = self.lock();
                    if inner.session_id.as_ref() == Some(session_id) {
                        inner.phase = Phase::InFlight { attempt };
                    }
                }
            }
        }
    }

}
