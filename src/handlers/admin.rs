// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    exam::normalizer::Pattern,
    models::{
        category::ExamCategory,
        question::{CreateQuestionRequest, UpdateQuestionRequest},
    },
    store::{Backend, StoreError},
    utils::html::{clean_html, clean_optional},
};

fn parse_category(raw: &str) -> Result<ExamCategory, AppError> {
    raw.parse::<ExamCategory>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn check_pattern(raw: &str) -> Result<(), AppError> {
    Pattern::parse(raw)
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest(format!("Unknown question pattern '{}'", raw)))
}

fn not_found(what: &str) -> impl Fn(StoreError) -> AppError + '_ {
    move |e| match e {
        StoreError::NotFound => AppError::NotFound(format!("{} not found", what)),
        other => AppError::from(other),
    }
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(backend): State<Arc<dyn Backend>>) -> Result<impl IntoResponse, AppError> {
    let users = backend.list_users().await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub category: Option<String>,
}

/// Every question, inactive ones included.
pub async fn list_questions(
    State(backend): State<Arc<dyn Backend>>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let category = params.category.as_deref().map(parse_category).transpose()?;
    let questions = backend.list_questions(category).await?;
    Ok(Json(questions))
}

/// Creates a question. Content is sanitized; category and pattern must be known.
pub async fn create_question(
    State(backend): State<Arc<dyn Backend>>,
    Json(mut payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    payload.category = parse_category(&payload.category)?.as_str().to_string();
    check_pattern(&payload.pattern)?;
    payload.content_th = clean_html(&payload.content_th);
    payload.content_en = clean_html(&payload.content_en);

    let id = backend.create_question(payload).await.map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(question_id = id, "Question created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Partial update. An empty body is a no-op.
pub async fn update_question(
    State(backend): State<Arc<dyn Backend>>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    if let Some(category) = payload.category.take() {
        payload.category = Some(parse_category(&category)?.as_str().to_string());
    }
    if let Some(pattern) = &payload.pattern {
        check_pattern(pattern)?;
    }
    payload.content_th = clean_optional(payload.content_th);
    payload.content_en = clean_optional(payload.content_en);

    backend
        .update_question(id, payload)
        .await
        .map_err(not_found("Question"))?;

    Ok(StatusCode::OK)
}

pub async fn delete_question(
    State(backend): State<Arc<dyn Backend>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    backend.delete_question(id).await.map_err(not_found("Question"))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_thresholds(State(backend): State<Arc<dyn Backend>>) -> Result<impl IntoResponse, AppError> {
    let thresholds = backend.list_thresholds().await?;
    Ok(Json(thresholds))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetThresholdRequest {
    pub category: ExamCategory,
    #[validate(range(min = 0, max = 100, message = "Threshold must be between 0 and 100."))]
    pub threshold: i32,
}

pub async fn set_threshold(
    State(backend): State<Arc<dyn Backend>>,
    Json(payload): Json<SetThresholdRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let threshold = u8::try_from(payload.threshold)
        .map_err(|_| AppError::BadRequest("Threshold must be between 0 and 100.".to_string()))?;
    backend.set_threshold(payload.category, threshold).await?;

    tracing::info!(category = %payload.category, threshold, "Pass threshold updated");
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct RecordListParams {
    pub user_id: Option<i64>,
}

/// Submission history across users, newest first.
pub async fn list_exam_records(
    State(backend): State<Arc<dyn Backend>>,
    Query(params): Query<RecordListParams>,
) -> Result<impl IntoResponse, AppError> {
    let records = backend.list_records(params.user_id).await?;
    Ok(Json(records))
}
