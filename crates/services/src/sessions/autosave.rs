use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use exam_core::pause::PauseSource;

use crate::api::ExamApi;
use crate::sessions::service::ExamSessionService;

/// Autosave policy knobs.
#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    /// Backup cadence for the periodic tick.
    pub interval: Duration,
    /// Whether the periodic save keeps running while the user has explicitly
    /// paused. Product versions disagree; kept as a policy flag.
    pub save_while_user_paused: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            save_while_user_paused: false,
        }
    }
}

/// What a save attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Fingerprint matched the last persisted snapshot; no network call.
    Unchanged,
    /// Skipped because the user holds an explicit pause.
    SkippedPaused,
    /// The network call failed; swallowed and left for the next tick.
    Failed,
}

/// Periodically and opportunistically persists progress, deduplicating via
/// the state fingerprint. Best-effort by contract: failures are logged and
/// never surface to the caller or block navigation.
#[derive(Clone)]
pub struct AutosaveController {
    api: Arc<dyn ExamApi>,
    config: AutosaveConfig,
}

impl AutosaveController {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>, config: AutosaveConfig) -> Self {
        Self { api, config }
    }

    /// Save the current progress if it changed since the last save.
    ///
    /// The payload and fingerprint are snapshotted under the lock, the
    /// network call runs without it, and only `last_saved_snapshot` is
    /// written back — concurrent navigation is never blocked or clobbered.
    pub async fn save_now(&self, session: &Arc<Mutex<ExamSessionService>>) -> SaveOutcome {
        let (session_id, fingerprint, payload) = {
            let session = session.lock().await;
            if !self.config.save_while_user_paused
                && session.state().pause_source == PauseSource::User
            {
                tracing::debug!("autosave skipped: user pause in effect");
                return SaveOutcome::SkippedPaused;
            }
            let fingerprint = session.fingerprint();
            if session.state().last_saved_snapshot.as_ref() == Some(&fingerprint) {
                tracing::debug!("autosave skipped: no change since last save");
                return SaveOutcome::Unchanged;
            }
            (
                session.session_id().clone(),
                fingerprint,
                session.progress_payload(),
            )
        };

        match self.api.auto_save(&session_id, &payload).await {
            Ok(()) => {
                tracing::debug!(session = %session_id, "autosave persisted");
                session.lock().await.record_saved(fingerprint);
                SaveOutcome::Saved
            }
            Err(error) => {
                // Best-effort: the next tick retries naturally because the
                // fingerprint still differs from the last saved one.
                tracing::warn!(session = %session_id, %error, "autosave failed");
                SaveOutcome::Failed
            }
        }
    }

    /// Fire-and-forget save for page-hidden/unload moments, where nothing can
    /// wait on the response.
    pub fn flush_detached(&self, session: Arc<Mutex<ExamSessionService>>) {
        let controller = self.clone();
        tokio::spawn(async move {
            let _ = controller.save_now(&session).await;
        });
    }

    /// Periodic backup loop. Runs until the owning task is aborted.
    pub async fn run(self, session: Arc<Mutex<ExamSessionService>>) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            interval.tick().await;
            let _ = self.save_now(&session).await;
        }
    }
}
