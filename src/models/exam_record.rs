// src/models/exam_record.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'exam_records' table in the database.
/// One row per submitted attempt, passed or not.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamRecord {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
    pub threshold: i32,
    pub passed: bool,
    pub permit_number: Option<String>,
    pub answers: serde_json::Value,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
