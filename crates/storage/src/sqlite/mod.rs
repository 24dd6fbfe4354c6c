use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use exam_core::model::SessionId;

use crate::repository::{SnapshotStore, StorageError, StoredAnswer, StoredProgress};

mod migrate;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Snapshot store backed by `SQLite`, for desktop/offline deployments.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn save(&self, progress: &StoredProgress) -> Result<(), StorageError> {
        let answers_json = serde_json::to_string(&progress.answers).map_err(ser)?;
        let marked_json = serde_json::to_string(&progress.marked_questions).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO exam_progress (
                session_id, current_question_index, answers, marked_questions,
                total_time_spent, remaining_time, saved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id) DO UPDATE SET
                current_question_index = excluded.current_question_index,
                answers = excluded.answers,
                marked_questions = excluded.marked_questions,
                total_time_spent = excluded.total_time_spent,
                remaining_time = excluded.remaining_time,
                saved_at = excluded.saved_at
            ",
        )
        .bind(progress.session_id.as_str())
        .bind(i64::from(progress.current_question_index))
        .bind(answers_json)
        .bind(marked_json)
        .bind(i64::from(progress.total_time_spent))
        .bind(i64::from(progress.remaining_time))
        .bind(progress.saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn load(&self, session_id: &SessionId) -> Result<Option<StoredProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT session_id, current_question_index, answers, marked_questions,
                   total_time_spent, remaining_time, saved_at
            FROM exam_progress WHERE session_id = ?1
            ",
        )
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let answers: Vec<StoredAnswer> =
            serde_json::from_str(row.try_get::<&str, _>("answers").map_err(ser)?).map_err(ser)?;
        let marked_questions: Vec<u64> =
            serde_json::from_str(row.try_get::<&str, _>("marked_questions").map_err(ser)?)
                .map_err(ser)?;

        let index = u32::try_from(
            row.try_get::<i64, _>("current_question_index")
                .map_err(ser)?,
        )
        .map_err(|_| StorageError::Serialization("invalid current_question_index".into()))?;
        let total = u32::try_from(row.try_get::<i64, _>("total_time_spent").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("invalid total_time_spent".into()))?;
        let remaining = u32::try_from(row.try_get::<i64, _>("remaining_time").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("invalid remaining_time".into()))?;
        let saved_at: DateTime<Utc> = row.try_get("saved_at").map_err(ser)?;

        Ok(Some(StoredProgress {
            session_id: SessionId::new(row.try_get::<&str, _>("session_id").map_err(ser)?),
            current_question_index: index,
            answers,
            marked_questions,
            total_time_spent: total,
            remaining_time: remaining,
            saved_at,
        }))
    }

    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_progress WHERE session_id = ?1")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
