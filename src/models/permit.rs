// src/models/permit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'permits' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Permit {
    pub id: i64,
    pub user_id: i64,
    pub permit_number: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 'active' or 'revoked'.
    pub status: String,
    /// Exam score that earned the permit.
    pub score: i32,
    pub max_score: i32,
}

impl Permit {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == "active" && self.expires_at > now
    }
}

/// Credential state after a submission was persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CredentialState {
    pub training_expires_at: Option<DateTime<Utc>>,
    pub permit: Option<Permit>,
}

/// Identity-card view of a user, used for on-site verification.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRecord {
    pub user_id: i64,
    pub full_name: String,
    pub organization: Option<String>,
    pub training_expires_at: Option<DateTime<Utc>>,
    pub training_valid: bool,
    /// Latest permit that is still active, if any.
    pub permit: Option<Permit>,
}

impl CredentialRecord {
    /// The permit stage of the UI is unlocked once training is valid.
    pub fn permit_stage_unlocked(&self) -> bool {
        self.training_valid
    }
}

/// One configured pass threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSetting {
    pub category: crate::models::category::ExamCategory,
    pub threshold: u8,
}
