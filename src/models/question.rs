// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'questions' table in the database.
///
/// Rows are consumed as-is; `exam::normalizer` turns them into typed questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: i64,

    /// Exam category tag (e.g. "training", "work_permit").
    pub category: String,

    pub content_th: String,

    pub content_en: String,

    /// Pattern discriminator as entered by the admin UI.
    /// Historical rows mix casings ("MATCHING", "matching", "multiple-choice").
    pub pattern: Option<String>,

    /// Choice payload. Either a JSON array or a JSON string holding a serialized array.
    pub choices: serde_json::Value,

    /// Authoritative correct choice index for choice patterns.
    pub correct_index: Option<i32>,

    /// Optional reference image in object storage.
    pub image_url: Option<String>,

    pub is_active: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 30))]
    pub category: String,
    #[validate(length(min = 1, max = 2000))]
    pub content_th: String,
    #[validate(length(min = 1, max = 2000))]
    pub content_en: String,
    #[validate(length(min = 1, max = 30))]
    pub pattern: String,
    pub choices: serde_json::Value,
    #[validate(range(min = 0))]
    pub correct_index: Option<i32>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 30))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub content_th: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub content_en: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub pattern: Option<String>,
    pub choices: Option<serde_json::Value>,
    #[validate(range(min = 0))]
    pub correct_index: Option<i32>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.content_th.is_none()
            && self.content_en.is_none()
            && self.pattern.is_none()
            && self.choices.is_none()
            && self.correct_index.is_none()
            && self.image_url.is_none()
            && self.is_active.is_none()
    }
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
