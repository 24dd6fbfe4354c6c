use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use exam_core::ProgressPayload;
use exam_core::model::{CategoryId, ExamSession, Question, QuestionId, SessionId};

use crate::error::ApiError;

/// Full payload for starting or resuming an exam session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResumedExam {
    pub session: ExamSession,
    pub questions: Vec<Question>,
}

/// Response of the active-session probe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActiveSessionCheck {
    pub has_active_session: bool,
    pub session_id: Option<SessionId>,
    pub session: Option<ExamSession>,
}

/// Server-scored result of a submitted exam. The server is the authority on
/// final scoring; nothing here is computed locally.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExamResult {
    pub session_id: SessionId,
    pub status: String,
    pub score: Option<f64>,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub total_time_spent: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Response to a question recategorization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryChange {
    pub message: String,
    pub question_id: QuestionId,
    pub old_category: String,
    pub new_category: String,
    pub new_category_id: CategoryId,
}

/// Contract for the remote exam service. Implemented over HTTP in production
/// and by in-memory fakes in tests.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// Start a brand-new exam session for this client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    async fn start_exam(&self, browser_fingerprint: &str) -> Result<ResumedExam, ApiError>;

    /// Ask whether this client already has an in-progress session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    async fn check_active_session(
        &self,
        browser_fingerprint: &str,
    ) -> Result<ActiveSessionCheck, ApiError>;

    /// Fetch the session record and question list for an existing session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    async fn resume_session(&self, session_id: &SessionId) -> Result<ResumedExam, ApiError>;

    /// Persist progress. PATCH-style partial update; safe to call repeatedly
    /// with an identical payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    async fn auto_save(
        &self,
        session_id: &SessionId,
        payload: &ProgressPayload,
    ) -> Result<(), ApiError>;

    /// Terminal submission. The server scores and closes the session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    async fn submit_exam(
        &self,
        session_id: &SessionId,
        payload: &ProgressPayload,
    ) -> Result<ExamResult, ApiError>;

    /// Move a question to another category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    async fn change_category(
        &self,
        question_id: QuestionId,
        new_category_id: CategoryId,
    ) -> Result<CategoryChange, ApiError>;
}

#[derive(Clone, Debug)]
pub struct ExamApiConfig {
    pub base_url: String,
}

impl ExamApiConfig {
    /// Read the endpoint from the environment, falling back to a local
    /// development server.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("EXAM_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api".into());
        Self { base_url }
    }
}

/// HTTP implementation of [`ExamApi`].
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: ExamApiConfig,
}

impl HttpExamApi {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ExamApiConfig::from_env())
    }

    #[must_use]
    pub fn new(config: ExamApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct FingerprintRequest<'a> {
    browser_fingerprint: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangeCategoryRequest {
    question_id: QuestionId,
    new_category_id: CategoryId,
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn start_exam(&self, browser_fingerprint: &str) -> Result<ResumedExam, ApiError> {
        let response = self
            .client
            .post(self.url("/exam-sessions/start/"))
            .json(&FingerprintRequest { browser_fingerprint })
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn check_active_session(
        &self,
        browser_fingerprint: &str,
    ) -> Result<ActiveSessionCheck, ApiError> {
        let response = self
            .client
            .post(self.url("/exam-sessions/check-active/"))
            .json(&FingerprintRequest { browser_fingerprint })
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn resume_session(&self, session_id: &SessionId) -> Result<ResumedExam, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/exam-sessions/{session_id}/resume/")))
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn auto_save(
        &self,
        session_id: &SessionId,
        payload: &ProgressPayload,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .patch(self.url(&format!("/exam-sessions/{session_id}/autosave/")))
            .json(payload)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn submit_exam(
        &self,
        session_id: &SessionId,
        payload: &ProgressPayload,
    ) -> Result<ExamResult, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/exam-sessions/{session_id}/submit/")))
            .json(payload)
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn change_category(
        &self,
        question_id: QuestionId,
        new_category_id: CategoryId,
    ) -> Result<CategoryChange, ApiError> {
        let response = self
            .client
            .patch(self.url("/questions/update-category/"))
            .json(&ChangeCategoryRequest {
                question_id,
                new_category_id,
            })
            .send()
            .await?;
        Ok(Self::expect_success(response).await?.json().await?)
    }
}
