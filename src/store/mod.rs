// src/store/mod.rs

//! Collaborator contracts for persistence.
//!
//! The exam engine only talks to these traits. `PgStore` backs them with
//! Postgres; `MemoryStore` keeps everything in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::exam::credential::CredentialMutation;
use crate::models::category::ExamCategory;
use crate::models::exam_record::ExamRecord;
use crate::models::permit::{CredentialRecord, CredentialState, ThresholdSetting};
use crate::models::question::{CreateQuestionRequest, QuestionRecord, UpdateQuestionRequest};
use crate::models::user::{NewUser, User};

pub mod memory;
pub mod postgres;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// History row written for every submission.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub user_id: i64,
    pub category: ExamCategory,
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
    pub threshold: i32,
    pub passed: bool,
    pub permit_number: Option<String>,
    pub answers: serde_json::Value,
    pub graded_at: DateTime<Utc>,
}

#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Active questions of one category, in storage order.
    async fn fetch_questions(&self, category: ExamCategory) -> Result<Vec<QuestionRecord>, StoreError>;

    /// Admin listing, including inactive rows.
    async fn list_questions(&self, category: Option<ExamCategory>) -> Result<Vec<QuestionRecord>, StoreError>;

    async fn create_question(&self, question: CreateQuestionRequest) -> Result<i64, StoreError>;

    async fn update_question(&self, id: i64, changes: UpdateQuestionRequest) -> Result<(), StoreError>;

    async fn delete_question(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Configured pass percentage, `None` when the category has no setting.
    async fn fetch_threshold(&self, category: ExamCategory) -> Result<Option<u8>, StoreError>;

    async fn set_threshold(&self, category: ExamCategory, threshold: u8) -> Result<(), StoreError>;

    async fn list_thresholds(&self) -> Result<Vec<ThresholdSetting>, StoreError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Persists the history row and, on a pass, the credential change, all or
    /// nothing. Callers are responsible for not submitting twice.
    async fn record_attempt(
        &self,
        record: AttemptRecord,
        mutation: Option<CredentialMutation>,
    ) -> Result<CredentialState, StoreError>;

    /// Submission history, newest first. `None` lists every user.
    async fn list_records(&self, user_id: Option<i64>) -> Result<Vec<ExamRecord>, StoreError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Identity-card data when the user holds valid training or an active permit.
    async fn active_credential(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<CredentialRecord>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// Everything the service needs from its backend.
pub trait Backend: QuestionBank + SettingsStore + AttemptStore + CredentialStore + UserStore {}

impl<T> Backend for T where T: QuestionBank + SettingsStore + AttemptStore + CredentialStore + UserStore {}

/// Builds the identity-card view from a user and their latest permit.
pub(crate) fn credential_record(
    user: User,
    permit: Option<crate::models::permit::Permit>,
    now: DateTime<Utc>,
) -> Option<CredentialRecord> {
    let training_valid = user.training_expires_at.is_some_and(|exp| exp > now);
    let permit = permit.filter(|p| p.is_active_at(now));

    if !training_valid && permit.is_none() {
        return None;
    }

    Some(CredentialRecord {
        user_id: user.id,
        full_name: user.full_name,
        organization: user.organization,
        training_expires_at: user.training_expires_at,
        training_valid,
        permit,
    })
}
