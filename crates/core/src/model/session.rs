use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CategoryId, QuestionId, SessionId};

/// Server-side session record, supplied once at initialization and treated as
/// read-mostly afterwards. The transition engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub session_id: SessionId,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds spent across the whole session, as recorded by the server.
    pub total_time_spent: u32,
    /// Full exam duration in seconds.
    pub exam_duration: u32,
    /// Countdown remainder in seconds at the time of the snapshot.
    pub remaining_time: u32,
    /// 1-based position of the question the candidate was last on.
    pub current_question_number: u32,
    pub total_questions: u32,
    pub score: Option<f64>,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub progress_percentage: f64,
}

/// One exam question as delivered by the server. Presentation fields
/// (`question_text`, choices) are carried opaquely for UI callers; the
/// session engine only reads the per-question progress fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question_number: u32,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub choice_a: String,
    #[serde(default)]
    pub choice_b: String,
    #[serde(default)]
    pub choice_c: String,
    #[serde(default)]
    pub choice_d: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub category_name: String,
    /// Previously recorded selection, used to rebuild local answers on resume.
    pub user_answer: Option<String>,
    #[serde(default)]
    pub time_spent: u32,
    #[serde(default)]
    pub marked_for_review: bool,
    pub first_viewed_at: Option<DateTime<Utc>>,
    pub answered_at: Option<DateTime<Utc>>,
}
