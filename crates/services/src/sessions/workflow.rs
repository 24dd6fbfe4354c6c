use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use exam_core::model::{CategoryId, QuestionId, SessionId};
use exam_core::time::Clock;
use storage::{SnapshotStore, StoredProgress};

use crate::api::{CategoryChange, ExamApi};
use crate::error::SessionError;
use crate::sessions::autosave::{AutosaveConfig, AutosaveController, SaveOutcome};
use crate::sessions::service::ExamSessionService;
use crate::sessions::submit::{RetryPolicy, SubmissionController, SubmitOutcome, SubmitStatus};
use crate::sessions::timer::{ExamTimer, TimeAlert};

/// Top-level handle for one running exam: the shared session, the countdown
/// and autosave tasks, and the submission state machine.
///
/// The session itself lives behind an async mutex so the timer, autosave and
/// caller-facing methods all act on one canonical state.
pub struct ExamRuntime {
    api: Arc<dyn ExamApi>,
    store: Arc<dyn SnapshotStore>,
    session: Arc<Mutex<ExamSessionService>>,
    autosave: AutosaveController,
    submission: SubmissionController,
    timer_handle: Option<JoinHandle<()>>,
    autosave_handle: Option<JoinHandle<()>>,
}

impl ExamRuntime {
    /// Start a brand-new exam session on the server.
    ///
    /// # Errors
    ///
    /// Propagates API failures and an unusable start payload.
    pub async fn start(
        api: Arc<dyn ExamApi>,
        store: Arc<dyn SnapshotStore>,
        browser_fingerprint: &str,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        let payload = api.start_exam(browser_fingerprint).await?;
        Self::from_payload(api, store, payload, clock)
    }

    /// Resume an existing session from the server.
    ///
    /// # Errors
    ///
    /// Propagates API failures and an unusable resume payload.
    pub async fn resume(
        api: Arc<dyn ExamApi>,
        store: Arc<dyn SnapshotStore>,
        session_id: &SessionId,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        let payload = api.resume_session(session_id).await?;
        Self::from_payload(api, store, payload, clock)
    }

    fn from_payload(
        api: Arc<dyn ExamApi>,
        store: Arc<dyn SnapshotStore>,
        payload: crate::api::ResumedExam,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        let service = ExamSessionService::resume(payload, clock)?;
        let session_id = service.session_id().clone();
        tracing::info!(
            session = %session_id,
            questions = service.question_count(),
            remaining = service.remaining_secs(),
            "exam session ready"
        );

        let autosave = AutosaveController::new(api.clone(), AutosaveConfig::default());
        let submission = SubmissionController::new(api.clone(), RetryPolicy::default());
        submission.reset_for_session(&session_id);

        Ok(Self {
            api,
            store,
            session: Arc::new(Mutex::new(service)),
            autosave,
            submission,
            timer_handle: None,
            autosave_handle: None,
        })
    }

    /// Shared handle to the session, for UIs that drive it directly.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<ExamSessionService>> {
        self.session.clone()
    }

    //
    // ─── BACKGROUND TASKS ──────────────────────────────────────────────────
    //

    /// Spawn the 1 Hz countdown. Threshold and expiry alerts arrive on the
    /// returned channel; a previous timer task, if any, is aborted first.
    pub fn spawn_timer(&mut self) -> mpsc::Receiver<TimeAlert> {
        if let Some(handle) = self.timer_handle.take() {
            handle.abort();
        }
        let (tx, rx) = mpsc::channel(8);
        let session = self.session.clone();
        self.timer_handle = Some(tokio::spawn(ExamTimer::new().run(session, tx)));
        rx
    }

    /// Spawn the periodic autosave loop.
    pub fn spawn_autosave(&mut self) {
        if let Some(handle) = self.autosave_handle.take() {
            handle.abort();
        }
        let session = self.session.clone();
        self.autosave_handle = Some(tokio::spawn(self.autosave.clone().run(session)));
    }

    /// Stop the background tasks. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.timer_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.autosave_handle.take() {
            handle.abort();
        }
    }

    //
    // ─── PERSISTENCE ───────────────────────────────────────────────────────
    //

    /// Push current progress to the server now, if it changed.
    pub async fn save_remote(&self) -> SaveOutcome {
        self.autosave.save_now(&self.session).await
    }

    /// Fire-and-forget remote save, for page-hidden moments.
    pub fn save_remote_detached(&self) {
        self.autosave.flush_detached(self.session.clone());
    }

    /// Cache the recovery subset of the session locally.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn save_local(&self) -> Result<(), SessionError> {
        let progress = {
            let session = self.session.lock().await;
            StoredProgress::capture(session.session_id().clone(), session.state(), session.now())
        };
        self.store.save(&progress).await?;
        Ok(())
    }

    /// Load the locally cached snapshot for this session, if any.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn load_local(&self) -> Result<Option<StoredProgress>, SessionError> {
        let session_id = self.session.lock().await.session_id().clone();
        Ok(self.store.load(&session_id).await?)
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────
    //

    /// Submit the exam. Flushes the time still accrued on the current
    /// question, then hands off to the exactly-once submission controller;
    /// on success the local recovery snapshot is dropped.
    pub async fn submit(&self) -> SubmitOutcome {
        let (session_id, payload) = {
            let mut session = self.session.lock().await;
            session.flush_current_elapsed();
            (session.session_id().clone(), session.progress_payload())
        };

        let outcome = self.submission.submit(&session_id, &payload).await;
        if matches!(
            outcome,
            SubmitOutcome::Submitted { .. } | SubmitOutcome::AlreadySubmitted(_)
        ) {
            // Best-effort cleanup; a stale local snapshot is harmless once
            // the server has the final result.
            if let Err(error) = self.store.clear(&session_id).await {
                tracing::warn!(session = %session_id, %error, "failed to clear local snapshot");
            }
        }
        outcome
    }

    #[must_use]
    pub fn submit_status(&self) -> SubmitStatus {
        self.submission.status()
    }

    #[must_use]
    pub fn submit_retry_count(&self) -> u32 {
        self.submission.retry_count()
    }

    //
    // ─── QUESTION MAINTENANCE ──────────────────────────────────────────────
    //

    /// Recategorize a question on the server and patch the local list.
    ///
    /// # Errors
    ///
    /// Propagates API failures; the local list is untouched on error.
    pub async fn change_category(
        &self,
        question_id: QuestionId,
        new_category_id: CategoryId,
    ) -> Result<CategoryChange, SessionError> {
        let change = self.api.change_category(question_id, new_category_id).await?;
        self.session.lock().await.update_question_category(&change);
        Ok(change)
    }
}

impl Drop for ExamRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
