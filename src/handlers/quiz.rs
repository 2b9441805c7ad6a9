// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    config::Config,
    error::AppError,
    models::quiz::{PublicQuiz, QuizResultResponse, SubmitQuizRequest},
    services::{certification::issue_certificate, scoring::evaluate},
    store::Store,
    utils::jwt::Claims,
};

/// Returns a module's quiz without the correct answers.
pub async fn get_quiz(
    State(store): State<Arc<dyn Store>>,
    Path(module_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = store
        .get_quiz_for_module(module_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(PublicQuiz::from(quiz)))
}

/// Scores a quiz attempt and, above the award threshold, issues a certificate.
///
/// * Answers are compared by position against the stored quiz.
/// * `passed` uses the quiz's own passing score; `can_get_certificate` uses
///   the configured award threshold.
/// * Issuance failures (including "already certified") are reported in
///   `certificate_error`; the score is returned either way.
pub async fn submit_quiz(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(module_id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quiz = store
        .get_quiz_for_module(module_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let evaluation = evaluate(&quiz, &req.answers, config.certificate_threshold)?;

    let (certificate, certificate_error) = if evaluation.can_get_certificate {
        match issue_certificate(store.as_ref(), user_id, &quiz, evaluation.score.percentage).await
        {
            Ok(certificate) => (Some(certificate), None),
            Err(e) => {
                tracing::warn!(
                    "Certificate not issued for user {} on module {}: {}",
                    user_id,
                    module_id,
                    e
                );
                (None, Some(e.public_message()))
            }
        }
    } else {
        (None, None)
    };

    Ok(Json(QuizResultResponse {
        correct: evaluation.score.correct,
        wrong: evaluation.score.wrong,
        total: evaluation.score.total,
        percentage: evaluation.score.percentage,
        passed: evaluation.passed,
        can_get_certificate: evaluation.can_get_certificate,
        certificate,
        certificate_error,
    }))
}
