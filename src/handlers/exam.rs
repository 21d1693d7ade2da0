// src/handlers/exam.rs

//! Exam session endpoints. Every route works on the caller's own session; the
//! engine decides what is allowed in which stage.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    exam::{
        answers::AnswerInput,
        controller::ExamController,
        registry::{SessionHandle, SessionRegistry},
        session::{ExamSession, SessionError, SessionView},
    },
    models::category::ExamCategory,
    store::Backend,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub category: ExamCategory,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: i64,
    pub answer: AnswerInput,
}

#[derive(Debug, Deserialize)]
pub struct PermitNumberRequest {
    pub permit_number: String,
}

fn lookup(sessions: &SessionRegistry, claims: &Claims, id: Uuid) -> Result<SessionHandle, AppError> {
    Ok(sessions.get(id, claims.user_id()?)?)
}

async fn render(handle: &SessionHandle, config: &Config) -> Json<SessionView> {
    let session = handle.lock().await;
    Json(session.view(config.manual_url(session.category())))
}

/// Applies a synchronous state change and returns the fresh view.
async fn mutate<F>(handle: &SessionHandle, config: &Config, change: F) -> Result<Json<SessionView>, AppError>
where
    F: FnOnce(&mut ExamSession) -> Result<(), SessionError>,
{
    let mut session = handle.lock().await;
    change(&mut session)?;
    Ok(Json(session.view(config.manual_url(session.category()))))
}

/// Opens a new attempt in READING. Replaces any earlier attempt of the same category.
pub async fn open_session(
    State(controller): State<ExamController>,
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = controller.open(claims.user_id()?, payload.category).await?;
    let handle = sessions.insert(session);
    Ok((StatusCode::CREATED, render(&handle, &config).await))
}

pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    Ok(render(&handle, &config).await)
}

/// Abandons an attempt. Nothing is persisted.
pub async fn abandon_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sessions.remove(id, claims.user_id()?)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn acknowledge(
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcknowledgeRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    mutate(&handle, &config, |s| s.acknowledge(payload.accepted)).await
}

pub async fn start(
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    mutate(&handle, &config, |s| s.start()).await
}

pub async fn goto_page(
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PageRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    mutate(&handle, &config, |s| s.goto_page(payload.page)).await
}

pub async fn answer(
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    mutate(&handle, &config, |s| s.answer(payload.question_id, payload.answer)).await
}

pub async fn set_permit_number(
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermitNumberRequest>,
) -> Result<Json<SessionView>, AppError> {
    if payload.permit_number.len() > 64 {
        return Err(AppError::BadRequest("Permit number is too long".to_string()));
    }
    let handle = lookup(&sessions, &claims, id)?;
    mutate(&handle, &config, |s| s.set_permit_number(&payload.permit_number)).await
}

/// Grades and persists the attempt.
///
/// A store failure answers 503 and leaves the attempt in progress, so the
/// client can simply submit again.
pub async fn submit(
    State(controller): State<ExamController>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    let result = controller.submit(&handle).await?;
    Ok(Json(result))
}

/// Back to READING with a reshuffled question set. Only after a failed attempt.
pub async fn restart(
    State(controller): State<ExamController>,
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&sessions, &claims, id)?;
    controller.restart(&handle).await?;
    Ok(render(&handle, &config).await)
}

/// Closes a passed attempt and returns the updated credential.
pub async fn accept(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let handle = sessions.get(id, user_id)?;
    let credential = handle.lock().await.accept()?;
    sessions.remove(id, user_id)?;
    Ok(Json(json!({ "credential": credential })))
}

/// The caller's submission history, newest first.
pub async fn history(
    State(backend): State<Arc<dyn Backend>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let records = backend.list_records(Some(claims.user_id()?)).await?;
    Ok(Json(records))
}
