// src/handlers/module.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{error::AppError, models::module::ModuleListParams, store::Store};

/// Lists all modules, optionally filtered by a title keyword.
pub async fn list_modules(
    State(store): State<Arc<dyn Store>>,
    Query(params): Query<ModuleListParams>,
) -> Result<impl IntoResponse, AppError> {
    let search = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let modules = store.list_modules(search).await?;

    Ok(Json(modules))
}

/// Retrieves a single module by ID.
pub async fn get_module(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let module = store
        .get_module(id)
        .await?
        .ok_or(AppError::NotFound("Module not found".to_string()))?;

    Ok(Json(module))
}
