// src/handlers/certificate.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    store::Store,
    utils::{certificate_number, jwt::Claims},
};

/// Lists the current user's certificates, newest first.
pub async fn list_my_certificates(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let certificates = store.list_certificates(claims.user_id()?).await?;

    Ok(Json(certificates))
}

/// Returns the current user's certificate for a module, or 404 if none was issued.
pub async fn get_my_certificate(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = store
        .find_certificate(claims.user_id()?, module_id)
        .await?
        .ok_or(AppError::NotFound(
            "No certificate for this module".to_string(),
        ))?;

    Ok(Json(certificate))
}

/// Public lookup of a certificate by its display number.
pub async fn verify_certificate(
    State(store): State<Arc<dyn Store>>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let number = number.trim().to_uppercase();
    if !certificate_number::is_well_formed(&number) {
        return Err(AppError::BadRequest(
            "Malformed certificate number".to_string(),
        ));
    }

    let certificate = store
        .find_certificate_by_number(&number)
        .await?
        .ok_or(AppError::NotFound("Certificate not found".to_string()))?;

    Ok(Json(certificate))
}
