// src/store/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    AttemptRecord, AttemptStore, CredentialStore, QuestionBank, SettingsStore, StoreError,
    UserStore, credential_record,
};
use crate::exam::credential::CredentialMutation;
use crate::models::category::ExamCategory;
use crate::models::exam_record::ExamRecord;
use crate::models::permit::{CredentialRecord, CredentialState, Permit, ThresholdSetting};
use crate::models::question::{CreateQuestionRequest, QuestionRecord, UpdateQuestionRequest};
use crate::models::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    questions: Vec<QuestionRecord>,
    thresholds: HashMap<ExamCategory, u8>,
    users: Vec<User>,
    attempts: Vec<ExamRecord>,
    permits: Vec<Permit>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store. Backs the integration tests and local demos; supports
/// injecting failures into submissions and settings lookups.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_submissions: AtomicBool,
    fail_settings: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }

    /// Inserts a raw row as-is (string-encoded payloads included). Returns its id.
    pub fn seed_question(&self, mut record: QuestionRecord) -> i64 {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        record.id = tables.next_id();
        let id = record.id;
        tables.questions.push(record);
        id
    }

    pub fn put_threshold(&self, category: ExamCategory, threshold: u8) {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.thresholds.insert(category, threshold);
    }

    /// Makes every `record_attempt` fail until switched off.
    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Makes every threshold lookup fail until switched off.
    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<ExamRecord> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner()).attempts.clone()
    }

    pub fn permits(&self) -> Vec<Permit> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner()).permits.clone()
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }
}

#[async_trait]
impl QuestionBank for MemoryStore {
    async fn fetch_questions(&self, category: ExamCategory) -> Result<Vec<QuestionRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .questions
            .iter()
            .filter(|q| q.is_active && category_matches(&q.category, category))
            .cloned()
            .collect())
    }

    async fn list_questions(&self, category: Option<ExamCategory>) -> Result<Vec<QuestionRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .questions
            .iter()
            .filter(|q| category.is_none_or(|c| category_matches(&q.category, c)))
            .cloned()
            .collect())
    }

    async fn create_question(&self, question: CreateQuestionRequest) -> Result<i64, StoreError> {
        let mut tables = self.lock()?;
        let id = tables.next_id();
        tables.questions.push(QuestionRecord {
            id,
            category: question.category,
            content_th: question.content_th,
            content_en: question.content_en,
            pattern: Some(question.pattern),
            choices: question.choices,
            correct_index: question.correct_index,
            image_url: question.image_url,
            is_active: question.is_active.unwrap_or(true),
            created_at: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn update_question(&self, id: i64, changes: UpdateQuestionRequest) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let question = tables
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(category) = changes.category {
            question.category = category;
        }
        if let Some(content_th) = changes.content_th {
            question.content_th = content_th;
        }
        if let Some(content_en) = changes.content_en {
            question.content_en = content_en;
        }
        if let Some(pattern) = changes.pattern {
            question.pattern = Some(pattern);
        }
        if let Some(choices) = changes.choices {
            question.choices = choices;
        }
        if let Some(correct_index) = changes.correct_index {
            question.correct_index = Some(correct_index);
        }
        if let Some(image_url) = changes.image_url {
            question.image_url = Some(image_url);
        }
        if let Some(is_active) = changes.is_active {
            question.is_active = is_active;
        }
        Ok(())
    }

    async fn delete_question(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        if tables.questions.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn fetch_threshold(&self, category: ExamCategory) -> Result<Option<u8>, StoreError> {
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("settings lookup failed".to_string()));
        }
        Ok(self.lock()?.thresholds.get(&category).copied())
    }

    async fn set_threshold(&self, category: ExamCategory, threshold: u8) -> Result<(), StoreError> {
        self.lock()?.thresholds.insert(category, threshold.min(100));
        Ok(())
    }

    async fn list_thresholds(&self) -> Result<Vec<ThresholdSetting>, StoreError> {
        let tables = self.lock()?;
        Ok(ExamCategory::ALL
            .iter()
            .filter_map(|c| {
                tables.thresholds.get(c).map(|t| ThresholdSetting {
                    category: *c,
                    threshold: *t,
                })
            })
            .collect())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn record_attempt(
        &self,
        record: AttemptRecord,
        mutation: Option<CredentialMutation>,
    ) -> Result<CredentialState, StoreError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("submission rejected by store".to_string()));
        }

        let mut tables = self.lock()?;
        let user_id = record.user_id;
        let user_index = tables
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;

        let mut issued = None;
        match mutation {
            Some(CredentialMutation::ExtendTraining { expires_at }) => {
                tables.users[user_index].training_expires_at = Some(expires_at);
            }
            Some(CredentialMutation::IssuePermit(new_permit)) => {
                if tables.permits.iter().any(|p| p.permit_number == new_permit.permit_number) {
                    return Err(StoreError::Conflict("Permit number already issued".to_string()));
                }
                let permit = Permit {
                    id: tables.next_id(),
                    user_id,
                    permit_number: new_permit.permit_number,
                    issued_at: new_permit.issued_at,
                    expires_at: new_permit.expires_at,
                    status: new_permit.status,
                    score: new_permit.score,
                    max_score: new_permit.max_score,
                };
                tables.permits.push(permit.clone());
                issued = Some(permit);
            }
            None => {}
        }
        let id = tables.next_id();
        tables.attempts.push(ExamRecord {
            id,
            user_id,
            category: record.category.as_str().to_string(),
            score: record.score,
            total: record.total,
            percentage: record.percentage,
            threshold: record.threshold,
            passed: record.passed,
            permit_number: record.permit_number,
            answers: record.answers,
            created_at: Some(record.graded_at),
        });

        Ok(CredentialState {
            training_expires_at: tables.users[user_index].training_expires_at,
            permit: issued,
        })
    }

    async fn list_records(&self, user_id: Option<i64>) -> Result<Vec<ExamRecord>, StoreError> {
        let tables = self.lock()?;
        let mut records: Vec<ExamRecord> = tables
            .attempts
            .iter()
            .filter(|r| user_id.is_none_or(|id| r.user_id == id))
            .cloned()
            .collect();
        records.reverse();
        Ok(records)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn active_credential(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let tables = self.lock()?;
        let Some(user) = tables.users.iter().find(|u| u.id == user_id).cloned() else {
            return Ok(None);
        };
        let permit = tables
            .permits
            .iter()
            .filter(|p| p.user_id == user_id && p.is_active_at(now))
            .max_by_key(|p| p.issued_at)
            .cloned();
        Ok(credential_record(user, permit, now))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        let created = User {
            id: tables.next_id(),
            username: user.username,
            password: user.password,
            role: user.role,
            full_name: user.full_name,
            organization: user.organization,
            training_expires_at: None,
            created_at: Some(Utc::now()),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.lock()?.users.clone();
        users.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(users)
    }
}

/// Exact tag comparison, as the `category = $1` filter in Postgres.
fn category_matches(raw: &str, category: ExamCategory) -> bool {
    raw == category.as_str()
}
