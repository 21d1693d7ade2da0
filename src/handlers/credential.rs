// src/handlers/credential.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::{error::AppError, store::Backend, utils::jwt::Claims};

/// The caller's identity card, or `null` when nothing is valid.
pub async fn my_credential(
    State(backend): State<Arc<dyn Backend>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let credential = backend.active_credential(user_id, Utc::now()).await?;
    let permit_stage_unlocked = credential.as_ref().is_some_and(|c| c.permit_stage_unlocked());

    Ok(Json(json!({
        "credential": credential,
        "permit_stage_unlocked": permit_stage_unlocked,
    })))
}

/// Public lookup used when a card's QR code is scanned on site.
pub async fn verify(
    State(backend): State<Arc<dyn Backend>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let credential = backend
        .active_credential(user_id, Utc::now())
        .await?
        .ok_or(AppError::NotFound("No valid credential for this user".to_string()))?;

    Ok(Json(credential))
}
