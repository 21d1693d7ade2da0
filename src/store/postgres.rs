// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

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

const QUESTION_COLUMNS: &str = "id, category, content_th, content_en, pattern, choices, \
     correct_index, image_url, is_active, created_at";

const USER_COLUMNS: &str =
    "id, username, password, role, full_name, organization, training_expires_at, created_at";

const PERMIT_COLUMNS: &str =
    "id, user_id, permit_number, issued_at, expires_at, status, score, max_score";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl QuestionBank for PgStore {
    async fn fetch_questions(&self, category: ExamCategory) -> Result<Vec<QuestionRecord>, StoreError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE category = $1 AND is_active = TRUE ORDER BY id"
        );
        let rows = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch questions for {}: {:?}", category, e);
                StoreError::from(e)
            })?;
        Ok(rows)
    }

    async fn list_questions(&self, category: Option<ExamCategory>) -> Result<Vec<QuestionRecord>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS} FROM questions"));
        if let Some(category) = category {
            builder.push(" WHERE category = ");
            builder.push_bind(category.as_str());
        }
        builder.push(" ORDER BY id DESC");

        let rows = builder
            .build_query_as::<QuestionRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_question(&self, question: CreateQuestionRequest) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO questions
            (category, content_th, content_en, pattern, choices, correct_index, image_url, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(question.category)
        .bind(question.content_th)
        .bind(question.content_en)
        .bind(question.pattern)
        .bind(question.choices)
        .bind(question.correct_index)
        .bind(question.image_url)
        .bind(question.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            StoreError::from(e)
        })?;
        Ok(id)
    }

    async fn update_question(&self, id: i64, changes: UpdateQuestionRequest) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        if let Some(category) = changes.category {
            separated.push("category = ");
            separated.push_bind_unseparated(category);
        }
        if let Some(content_th) = changes.content_th {
            separated.push("content_th = ");
            separated.push_bind_unseparated(content_th);
        }
        if let Some(content_en) = changes.content_en {
            separated.push("content_en = ");
            separated.push_bind_unseparated(content_en);
        }
        if let Some(pattern) = changes.pattern {
            separated.push("pattern = ");
            separated.push_bind_unseparated(pattern);
        }
        if let Some(choices) = changes.choices {
            separated.push("choices = ");
            separated.push_bind_unseparated(choices);
        }
        if let Some(correct_index) = changes.correct_index {
            separated.push("correct_index = ");
            separated.push_bind_unseparated(correct_index);
        }
        if let Some(image_url) = changes.image_url {
            separated.push("image_url = ");
            separated.push_bind_unseparated(image_url);
        }
        if let Some(is_active) = changes.is_active {
            separated.push("is_active = ");
            separated.push_bind_unseparated(is_active);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_question(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn fetch_threshold(&self, category: ExamCategory) -> Result<Option<u8>, StoreError> {
        let value: Option<i32> =
            sqlx::query_scalar("SELECT threshold FROM exam_settings WHERE category = $1")
                .bind(category.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.map(|v| v.clamp(0, 100) as u8))
    }

    async fn set_threshold(&self, category: ExamCategory, threshold: u8) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exam_settings (category, threshold)
            VALUES ($1, $2)
            ON CONFLICT (category) DO UPDATE SET threshold = EXCLUDED.threshold, updated_at = NOW()
            "#,
        )
        .bind(category.as_str())
        .bind(i32::from(threshold.min(100)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_thresholds(&self) -> Result<Vec<ThresholdSetting>, StoreError> {
        let rows: Vec<(String, i32)> =
            sqlx::query_as("SELECT category, threshold FROM exam_settings ORDER BY category")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(category, threshold)| {
                let category = category.parse::<ExamCategory>().ok()?;
                Some(ThresholdSetting {
                    category,
                    threshold: threshold.clamp(0, 100) as u8,
                })
            })
            .collect())
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn record_attempt(
        &self,
        record: AttemptRecord,
        mutation: Option<CredentialMutation>,
    ) -> Result<CredentialState, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO exam_records
            (user_id, category, score, total, percentage, threshold, passed, permit_number, answers, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.user_id)
        .bind(record.category.as_str())
        .bind(record.score)
        .bind(record.total)
        .bind(record.percentage)
        .bind(record.threshold)
        .bind(record.passed)
        .bind(&record.permit_number)
        .bind(&record.answers)
        .bind(record.graded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert exam record: {:?}", e);
            StoreError::from(e)
        })?;

        let mut permit = None;
        match mutation {
            Some(CredentialMutation::ExtendTraining { expires_at }) => {
                let result = sqlx::query("UPDATE users SET training_expires_at = $1 WHERE id = $2")
                    .bind(expires_at)
                    .bind(record.user_id)
                    .execute(&mut *tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound);
                }
            }
            Some(CredentialMutation::IssuePermit(new_permit)) => {
                let sql = format!(
                    "INSERT INTO permits (user_id, permit_number, issued_at, expires_at, status, score, max_score) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PERMIT_COLUMNS}"
                );
                let inserted = sqlx::query_as::<_, Permit>(&sql)
                    .bind(record.user_id)
                    .bind(new_permit.permit_number)
                    .bind(new_permit.issued_at)
                    .bind(new_permit.expires_at)
                    .bind(new_permit.status)
                    .bind(new_permit.score)
                    .bind(new_permit.max_score)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            StoreError::Conflict("Permit number already issued".to_string())
                        } else {
                            tracing::error!("Failed to issue permit: {:?}", e);
                            StoreError::from(e)
                        }
                    })?;
                permit = Some(inserted);
            }
            None => {}
        }

        let training_expires_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT training_expires_at FROM users WHERE id = $1")
                .bind(record.user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::NotFound)?;

        tx.commit().await?;

        Ok(CredentialState {
            training_expires_at,
            permit,
        })
    }

    async fn list_records(&self, user_id: Option<i64>) -> Result<Vec<ExamRecord>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, category, score, total, percentage, threshold, passed, \
             permit_number, answers, created_at FROM exam_records",
        );
        if let Some(user_id) = user_id {
            builder.push(" WHERE user_id = ");
            builder.push_bind(user_id);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        Ok(builder
            .build_query_as::<ExamRecord>()
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn active_credential(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let Some(user) = self.find_by_id(user_id).await? else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {PERMIT_COLUMNS} FROM permits \
             WHERE user_id = $1 AND status = 'active' AND expires_at > $2 \
             ORDER BY issued_at DESC LIMIT 1"
        );
        let permit = sqlx::query_as::<_, Permit>(&sql)
            .bind(user_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credential_record(user, permit, now))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, password, role, full_name, organization) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.role)
            .bind(&user.full_name)
            .bind(&user.organization)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("Username '{}' already exists", user.username))
                } else {
                    tracing::error!("Failed to create user: {:?}", e);
                    StoreError::from(e)
                }
            })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }
}
