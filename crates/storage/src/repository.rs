use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use exam_core::model::{Answer, QuestionId, SessionId};
use exam_core::pause::PauseSource;
use exam_core::state::ExamState;

/// Errors surfaced by snapshot stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of one answer inside a progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAnswer {
    pub question_id: u64,
    pub selected_option: Option<String>,
    pub time_spent: u32,
    pub marked_for_review: bool,
    pub updated_at: DateTime<Utc>,
}

/// The partial exam-state subset cached locally for reload recovery.
///
/// Mirrors the fields worth surviving a reload: position, answers, marks and
/// the two time counters. Pause state is deliberately not persisted; a
/// recovered session always starts unpaused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProgress {
    pub session_id: SessionId,
    pub current_question_index: u32,
    pub answers: Vec<StoredAnswer>,
    pub marked_questions: Vec<u64>,
    pub total_time_spent: u32,
    pub remaining_time: u32,
    pub saved_at: DateTime<Utc>,
}

impl StoredProgress {
    /// Capture the persistable subset of the given state.
    #[must_use]
    pub fn capture(session_id: SessionId, state: &ExamState, saved_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            current_question_index: u32::try_from(state.current_question_index).unwrap_or(0),
            answers: state
                .answers
                .values()
                .map(|answer| StoredAnswer {
                    question_id: answer.question_id.value(),
                    selected_option: answer.selected_option.clone(),
                    time_spent: answer.time_spent_secs,
                    marked_for_review: answer.marked_for_review,
                    updated_at: answer.updated_at,
                })
                .collect(),
            marked_questions: state.marked_questions.iter().map(QuestionId::value).collect(),
            total_time_spent: state.total_time_spent_secs,
            remaining_time: state.remaining_secs,
            saved_at,
        }
    }

    /// Rebuild an unpaused exam state from this snapshot.
    #[must_use]
    pub fn restore_state(&self, now: DateTime<Utc>) -> ExamState {
        let mut state = ExamState::new(now, self.remaining_time);
        state.current_question_index = self.current_question_index as usize;
        state.total_time_spent_secs = self.total_time_spent;
        state.is_paused = false;
        state.pause_source = PauseSource::None;
        for stored in &self.answers {
            let question_id = QuestionId::new(stored.question_id);
            state.answers.insert(
                question_id,
                Answer {
                    question_id,
                    selected_option: stored.selected_option.clone(),
                    time_spent_secs: stored.time_spent,
                    marked_for_review: stored.marked_for_review,
                    updated_at: stored.updated_at,
                },
            );
        }
        state.marked_questions = self
            .marked_questions
            .iter()
            .map(|id| QuestionId::new(*id))
            .collect();
        state
    }
}

/// Contract for local progress caches.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist or replace the snapshot for its session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save(&self, progress: &StoredProgress) -> Result<(), StorageError>;

    /// Fetch the snapshot for a session, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for storage failures; a missing snapshot is
    /// `Ok(None)`, not an error.
    async fn load(&self, session_id: &SessionId) -> Result<Option<StoredProgress>, StorageError>;

    /// Drop the snapshot for a session (post-submission cleanup).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError>;
}

/// Simple in-memory snapshot store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<Mutex<HashMap<SessionId, StoredProgress>>>,
}

impl InMemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, StoredProgress>>, StorageError> {
        self.snapshots
            .lock()
            .map_err(|_| StorageError::Connection("snapshot store lock poisoned".into()))
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, progress: &StoredProgress) -> Result<(), StorageError> {
        self.lock()?
            .insert(progress.session_id.clone(), progress.clone());
        Ok(())
    }

    async fn load(&self, session_id: &SessionId) -> Result<Option<StoredProgress>, StorageError> {
        Ok(self.lock()?.get(session_id).cloned())
    }

    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError> {
        self.lock()?.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;

    fn sample_state() -> ExamState {
        let mut state = ExamState::new(fixed_now(), 1200);
        let q1 = QuestionId::new(1);
        state.answers.insert(
            q1,
            Answer {
                question_id: q1,
                selected_option: Some("c".into()),
                time_spent_secs: 45,
                marked_for_review: true,
                updated_at: fixed_now(),
            },
        );
        state.marked_questions.insert(q1);
        state.current_question_index = 4;
        state.total_time_spent_secs = 300;
        state
    }

    #[test]
    fn capture_and_restore_round_trip() {
        let state = sample_state();
        let stored = StoredProgress::capture(SessionId::new("s-1"), &state, fixed_now());
        let restored = stored.restore_state(fixed_now());

        assert_eq!(restored.current_question_index, 4);
        assert_eq!(restored.total_time_spent_secs, 300);
        assert_eq!(restored.remaining_secs, 1200);
        assert!(restored.is_marked(QuestionId::new(1)));
        let answer = restored.answer(QuestionId::new(1)).unwrap();
        assert_eq!(answer.selected_option.as_deref(), Some("c"));
        assert!(!restored.is_paused);
    }

    #[tokio::test]
    async fn in_memory_store_saves_loads_and_clears() {
        let store = InMemorySnapshotStore::new();
        let session_id = SessionId::new("s-2");
        let stored = StoredProgress::capture(session_id.clone(), &sample_state(), fixed_now());

        store.save(&stored).await.unwrap();
        let loaded = store.load(&session_id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);

        store.clear(&session_id).await.unwrap();
        assert!(store.load(&session_id).await.unwrap().is_none());
    }
}
