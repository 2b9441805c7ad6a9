// src/handlers/forum.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::CommentRequest,
        topic::{CreateTopicRequest, TopicListParams, UpdateTopicRequest},
    },
    store::Store,
    utils::{html::clean_html, jwt::Claims},
};

/// Titles are stored trimmed; blank after trimming is rejected.
fn clean_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title must not be blank".to_string()));
    }
    Ok(title.to_string())
}

/// Bodies are sanitized first, so markup that is stripped entirely
/// (e.g. a lone `<script>`) counts as blank.
fn clean_body(raw: &str) -> Result<String, AppError> {
    let body = clean_html(raw);
    if body.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Content must not be blank".to_string(),
        ));
    }
    Ok(body)
}

/// List topics (Recent first).
/// Supports cursor-based pagination and title search.
pub async fn list_topics(
    State(store): State<Arc<dyn Store>>,
    Query(params): Query<TopicListParams>,
) -> Result<impl IntoResponse, AppError> {
    let topics = store.list_topics(&params).await?;

    Ok(Json(topics))
}

/// Get a single topic by ID.
pub async fn get_topic(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let topic = store
        .get_topic(id)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    Ok(Json(topic))
}

/// Create a new topic.
pub async fn create_topic(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let title = clean_title(&payload.title)?;
    let body = clean_body(&payload.body)?;

    let topic = store
        .create_topic(claims.user_id()?, title, body)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create topic: {:?}", e);
            e
        })?;

    Ok((StatusCode::CREATED, Json(topic)))
}

/// Edit a topic. Only its author may edit it.
pub async fn update_topic(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let topic = store
        .get_topic(id)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    if topic.author_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You can only edit your own topics".to_string(),
        ));
    }

    let title = payload.title.as_deref().map(clean_title).transpose()?;
    let body = payload.body.as_deref().map(clean_body).transpose()?;

    let updated = store
        .update_topic(id, title, body)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a topic and its comments (Hard Delete).
/// Requires: Author OR Admin.
pub async fn delete_topic(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let topic = store
        .get_topic(id)
        .await?
        .ok_or(AppError::NotFound("Topic not found".to_string()))?;

    if topic.author_id != claims.user_id()? && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this topic".to_string(),
        ));
    }

    if !store.delete_topic(id).await? {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// List all comments for a topic, oldest first.
pub async fn list_comments(
    State(store): State<Arc<dyn Store>>,
    Path(topic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if store.get_topic(topic_id).await?.is_none() {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    let comments = store.list_comments(topic_id).await?;

    Ok(Json(comments))
}

/// Create a new comment on a topic.
pub async fn create_comment(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(topic_id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if store.get_topic(topic_id).await?.is_none() {
        return Err(AppError::NotFound("Topic not found".to_string()));
    }

    let body = clean_body(&payload.body)?;

    let comment = store
        .create_comment(topic_id, claims.user_id()?, body)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit a comment. Only its author may edit it.
pub async fn update_comment(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let comment = store
        .get_comment(id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You can only edit your own comments".to_string(),
        ));
    }

    let body = clean_body(&payload.body)?;

    let updated = store
        .update_comment(id, body)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(Json(updated))
}

/// Delete a comment (Hard Delete).
/// Requires: Author OR Admin.
pub async fn delete_comment(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let comment = store
        .get_comment(id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != claims.user_id()? && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this comment".to_string(),
        ));
    }

    if !store.delete_comment(id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
