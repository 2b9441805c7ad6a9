// tests/postgres_store_tests.rs
//
// Runs against the database in DATABASE_URL. Without one (or with
// `memory://`) the PostgreSQL cases return early.

use std::{sync::Arc, time::Duration};

use academy::{
    config::MEMORY_STORE_URL,
    error::AppError,
    models::{
        module::CreateModuleRequest,
        quiz::{Question, Quiz, QuizConfig},
        topic::TopicListParams,
        user::{NewUser, Role},
    },
    services::certification::{ALREADY_CERTIFIED, issue_certificate},
    store::{MemoryStore, PgStore, Store},
};
use sqlx::{PgPool, postgres::PgPoolOptions};

async fn connect() -> Option<(PgPool, PgStore)> {
    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| url != MEMORY_STORE_URL)?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    let store = PgStore::new(pool.clone());
    store.migrate().await.expect("Failed to migrate database");

    Some((pool, store))
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

fn question(prompt: &str, correct: usize) -> Question {
    Question::new(
        prompt,
        vec!["A".to_string(), "B".to_string(), "C".to_string()],
        correct,
    )
    .unwrap()
}

/// A fresh user, module and quiz with unique names.
async fn seed(store: &dyn Store) -> (i64, Quiz) {
    let user = store
        .create_user(NewUser {
            username: unique("u"),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap();
    let module = store
        .create_module(CreateModuleRequest {
            title: unique("module"),
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
                title: "Quiz".to_string(),
                passing_score: 60,
                questions: vec![question("Q1", 0), question("Q2", 2)],
            },
        )
        .await
        .unwrap();
    (user.id, quiz)
}

#[tokio::test]
async fn quiz_upsert_round_trip() {
    let Some((_, store)) = connect().await else {
        return;
    };
    let (_, first) = seed(&store).await;

    let second = store
        .upsert_quiz(
            first.module_id,
            QuizConfig {
                title: "Quiz v2".to_string(),
                passing_score: 75,
                questions: vec![question("Only", 1)],
            },
        )
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);

    let stored = store
        .get_quiz_for_module(first.module_id)
        .await
        .unwrap()
        .expect("quiz exists");
    assert_eq!(stored.title, "Quiz v2");
    assert_eq!(stored.passing_score, 75);
    assert_eq!(stored.questions, vec![question("Only", 1)]);
    assert_eq!(stored.questions[0].correct(), 1);
}

#[tokio::test]
async fn corrupted_stored_quiz_is_not_served() {
    let Some((pool, store)) = connect().await else {
        return;
    };
    let (_, quiz) = seed(&store).await;

    sqlx::query(
        r#"UPDATE quizzes SET questions = '[{"question":"Q","answers":["a","b"],"correct":5}]'
           WHERE id = $1"#,
    )
    .bind(quiz.id)
    .execute(&pool)
    .await
    .unwrap();

    assert!(store.get_quiz_for_module(quiz.module_id).await.is_err());
}

#[tokio::test]
async fn duplicate_issuance_is_already_certified() {
    let Some((_, store)) = connect().await else {
        return;
    };
    let (user_id, quiz) = seed(&store).await;

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
async fn concurrent_issuance_creates_one_record() {
    let Some((_, store)) = connect().await else {
        return;
    };
    let (user_id, quiz) = seed(&store).await;
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

#[tokio::test]
async fn certified_module_cannot_be_deleted() {
    let Some((_, store)) = connect().await else {
        return;
    };
    let (user_id, quiz) = seed(&store).await;
    issue_certificate(&store, user_id, &quiz, 90).await.unwrap();

    let err = store.delete_module(quiz.module_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
    assert!(store.get_module(quiz.module_id).await.unwrap().is_some());

    // Dropping the quiz keeps what was already issued.
    assert!(store.delete_quiz(quiz.module_id).await.unwrap());
    assert_eq!(store.list_certificates(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn issuance_for_deleted_module_is_not_found() {
    let Some((_, store)) = connect().await else {
        return;
    };
    let (user_id, quiz) = seed(&store).await;
    assert!(store.delete_module(quiz.module_id).await.unwrap());

    let err = issue_certificate(&store, user_id, &quiz, 100)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn topic_cursor_pagination() {
    let Some((_, store)) = connect().await else {
        return;
    };
    let author = store
        .create_user(NewUser {
            username: unique("u"),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap();
    let tag = unique("tag");

    for n in 1..=3 {
        store
            .create_topic(author.id, format!("{} #{}", tag, n), "body".to_string())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut params = TopicListParams {
        q: Some(tag.clone()),
        limit: Some(2),
        cursor: None,
    };
    let page = store.list_topics(&params).await.unwrap();
    let titles: Vec<_> = page.iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, vec![format!("{} #3", tag), format!("{} #2", tag)]);

    params.cursor = page.last().map(|t| t.created_at);
    let rest = store.list_topics(&params).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].title, format!("{} #1", tag));
    assert_eq!(rest[0].author_username, author.username);
}

/// `%` and `_` in a search keyword match literally in both stores.
async fn assert_literal_module_search(store: &dyn Store) {
    let tag = unique("tag");
    for title in [format!("{} 100% safe", tag), format!("{} 1000 safe", tag)] {
        store
            .create_module(CreateModuleRequest {
                title,
                description: String::new(),
                chapters: vec![],
                image_url: None,
            })
            .await
            .unwrap();
    }

    let percent = store
        .list_modules(Some(&format!("{} 100%", tag)))
        .await
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, format!("{} 100% safe", tag));

    let underscore = store
        .list_modules(Some(&format!("{} 1_00", tag)))
        .await
        .unwrap();
    assert!(underscore.is_empty());
}

#[tokio::test]
async fn search_keywords_match_literally() {
    assert_literal_module_search(&MemoryStore::new()).await;

    if let Some((_, store)) = connect().await {
        assert_literal_module_search(&store).await;
    }
}
