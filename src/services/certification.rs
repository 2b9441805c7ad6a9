// src/services/certification.rs

use crate::{
    error::{AppError, DUPLICATE_RECORD},
    models::{
        certificate::{Certificate, NewCertificate},
        quiz::Quiz,
    },
    store::Store,
    utils::certificate_number,
};

pub const ALREADY_CERTIFIED: &str = "You already hold a certificate for this module";

/// Issues a certificate for `user_id` on the quiz's module.
///
/// The existence check gives the common case a clear answer. The storage
/// uniqueness constraint on (user, module) decides the race between two
/// concurrent submissions: whichever insert loses gets the same conflict.
/// Other insert failures (a module deleted meanwhile) pass through unchanged.
pub async fn issue_certificate(
    store: &dyn Store,
    user_id: i64,
    quiz: &Quiz,
    percentage: u8,
) -> Result<Certificate, AppError> {
    if store.find_certificate(user_id, quiz.module_id).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_CERTIFIED.to_string()));
    }

    let certificate = NewCertificate {
        user_id,
        module_id: quiz.module_id,
        quiz_id: quiz.id,
        certificate_number: certificate_number::generate(),
        score: i16::from(percentage),
    };

    let issued = store
        .insert_certificate(certificate)
        .await
        .map_err(|e| match e {
            AppError::Conflict(msg) if msg == DUPLICATE_RECORD => {
                AppError::Conflict(ALREADY_CERTIFIED.to_string())
            }
            other => other,
        })?;

    tracing::info!(
        "Issued certificate {} to user {} for module {}",
        issued.certificate_number,
        user_id,
        quiz.module_id
    );

    Ok(issued)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        models::{
            module::CreateModuleRequest,
            quiz::{Question, QuizConfig},
            user::{NewUser, Role},
        },
        store::MemoryStore,
        utils::certificate_number::is_well_formed,
    };

    async fn seeded() -> (MemoryStore, i64, Quiz) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let module = store
            .create_module(CreateModuleRequest {
                title: "Ownership".to_string(),
                description: String::new(),
                chapters: vec![],
                image_url: None,
            })
            .await
            .unwrap();
        let quiz = store
            .upsert_quiz(
                module.id,
                QuizConfig {
                    title: "Ownership quiz".to_string(),
                    passing_score: 60,
                    questions: vec![
                        Question::new("Q", vec!["a".to_string(), "b".to_string()], 1).unwrap(),
                    ],
                },
            )
            .await
            .unwrap();
        (store, user.id, quiz)
    }

    #[tokio::test]
    async fn test_issues_certificate() {
        let (store, user_id, quiz) = seeded().await;

        let certificate = issue_certificate(&store, user_id, &quiz, 90).await.unwrap();

        assert_eq!(certificate.user_id, user_id);
        assert_eq!(certificate.module_id, quiz.module_id);
        assert_eq!(certificate.quiz_id, quiz.id);
        assert_eq!(certificate.score, 90);
        assert!(is_well_formed(&certificate.certificate_number));
    }

    #[tokio::test]
    async fn test_second_issue_is_already_certified() {
        let (store, user_id, quiz) = seeded().await;

        issue_certificate(&store, user_id, &quiz, 90).await.unwrap();
        let err = issue_certificate(&store, user_id, &quiz, 100)
            .await
            .unwrap_err();

        match err {
            AppError::Conflict(msg) => assert_eq!(msg, ALREADY_CERTIFIED),
            other => panic!("expected conflict, got {:?}", other),
        }
        let certificates = store.list_certificates(user_id).await.unwrap();
        assert_eq!(certificates.len(), 1);
        assert_eq!(certificates[0].score, 90);
    }

    #[tokio::test]
    async fn test_deleted_module_is_not_reported_as_already_certified() {
        let (store, user_id, quiz) = seeded().await;
        assert!(store.delete_module(quiz.module_id).await.unwrap());

        let err = issue_certificate(&store, user_id, &quiz, 100)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
        assert_ne!(err.public_message(), ALREADY_CERTIFIED);
        assert!(store.list_certificates(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_issue_creates_one_record() {
        let (store, user_id, quiz) = seeded().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let quiz = quiz.clone();
                tokio::spawn(async move {
                    issue_certificate(store.as_ref(), user_id, &quiz, 85).await
                })
            })
            .collect();

        let mut issued = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => issued += 1,
                Err(AppError::Conflict(msg)) => assert_eq!(msg, ALREADY_CERTIFIED),
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(issued, 1);
        assert_eq!(store.list_certificates(user_id).await.unwrap().len(), 1);
    }
}
