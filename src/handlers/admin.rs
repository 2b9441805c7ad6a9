// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        module::{CreateModuleRequest, UpdateModuleRequest},
        quiz::QuizConfig,
        user::UpdateRoleRequest,
    },
    store::Store,
    utils::jwt::Claims,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    let users = store.list_users().await.map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        e
    })?;

    Ok(Json(users))
}

/// Changes a user's role.
/// Admin only. Admins cannot demote themselves.
pub async fn update_user_role(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot change your own role".to_string()));
    }

    if !store.update_user_role(id, payload.role).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} role set to {}", id, payload.role);
    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    if !store.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new module.
/// Admin only.
pub async fn create_module(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let module = store.create_module(payload).await.map_err(|e| {
        tracing::error!("Failed to create module: {:?}", e);
        e
    })?;

    Ok((StatusCode::CREATED, Json(module)))
}

/// Updates a module by ID.
/// Admin only.
pub async fn update_module(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        let module = store
            .get_module(id)
            .await?
            .ok_or(AppError::NotFound("Module not found".to_string()))?;
        return Ok(Json(module));
    }

    let module = store
        .update_module(id, payload)
        .await?
        .ok_or(AppError::NotFound("Module not found".to_string()))?;

    Ok(Json(module))
}

/// Deletes a module and its quiz.
/// Admin only. Fails with 409 while certificates reference the module.
pub async fn delete_module(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_module(id).await? {
        return Err(AppError::NotFound("Module not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns a module's quiz including correct answers.
/// Admin only.
pub async fn get_quiz(
    State(store): State<Arc<dyn Store>>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = store
        .get_quiz_for_module(module_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Creates or replaces the quiz of a module.
/// Admin only.
pub async fn upsert_quiz(
    State(store): State<Arc<dyn Store>>,
    Path(module_id): Path<i64>,
    Json(config): Json<QuizConfig>,
) -> Result<impl IntoResponse, AppError> {
    config.validate()?;

    if store.get_module(module_id).await?.is_none() {
        return Err(AppError::NotFound("Module not found".to_string()));
    }

    let quiz = store.upsert_quiz(module_id, config).await?;

    Ok(Json(quiz))
}

/// Deletes the quiz of a module. Issued certificates are kept.
/// Admin only.
pub async fn delete_quiz(
    State(store): State<Arc<dyn Store>>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_quiz(module_id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
