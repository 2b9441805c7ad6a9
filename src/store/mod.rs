// src/store/mod.rs

//! Persistence boundary.
//!
//! Handlers only talk to `dyn Store`. Absent rows come back as `None` (or
//! `false` for deletes); every other failure is an [`AppError`] already
//! translated through [`AppError::from_store_message`].

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        certificate::{Certificate, NewCertificate},
        comment::Comment,
        module::{CreateModuleRequest, Module, UpdateModuleRequest},
        quiz::{Quiz, QuizConfig},
        topic::{Topic, TopicListParams},
        user::{NewUser, Role, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn update_user_role(&self, id: i64, role: Role) -> Result<bool, AppError>;
    async fn delete_user(&self, id: i64) -> Result<bool, AppError>;

    // Modules
    async fn list_modules(&self, search: Option<&str>) -> Result<Vec<Module>, AppError>;
    async fn get_module(&self, id: i64) -> Result<Option<Module>, AppError>;
    async fn create_module(&self, module: CreateModuleRequest) -> Result<Module, AppError>;
    async fn update_module(
        &self,
        id: i64,
        patch: UpdateModuleRequest,
    ) -> Result<Option<Module>, AppError>;
    async fn delete_module(&self, id: i64) -> Result<bool, AppError>;

    // Quizzes (one per module, keyed on module id)
    async fn get_quiz_for_module(&self, module_id: i64) -> Result<Option<Quiz>, AppError>;
    async fn upsert_quiz(&self, module_id: i64, config: QuizConfig) -> Result<Quiz, AppError>;
    async fn delete_quiz(&self, module_id: i64) -> Result<bool, AppError>;

    // Certificates
    async fn find_certificate(
        &self,
        user_id: i64,
        module_id: i64,
    ) -> Result<Option<Certificate>, AppError>;
    async fn find_certificate_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Certificate>, AppError>;
    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, AppError>;
    /// Fails with `AppError::Conflict` when (user, module) already holds a certificate.
    async fn insert_certificate(&self, certificate: NewCertificate)
    -> Result<Certificate, AppError>;

    // Forum topics
    async fn list_topics(&self, params: &TopicListParams) -> Result<Vec<Topic>, AppError>;
    async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError>;
    async fn create_topic(&self, author_id: i64, title: String, body: String)
    -> Result<Topic, AppError>;
    async fn update_topic(
        &self,
        id: i64,
        title: Option<String>,
        body: Option<String>,
    ) -> Result<Option<Topic>, AppError>;
    async fn delete_topic(&self, id: i64) -> Result<bool, AppError>;

    // Forum comments
    async fn list_comments(&self, topic_id: i64) -> Result<Vec<Comment>, AppError>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError>;
    async fn create_comment(
        &self,
        topic_id: i64,
        author_id: i64,
        body: String,
    ) -> Result<Comment, AppError>;
    async fn update_comment(&self, id: i64, body: String) -> Result<Option<Comment>, AppError>;
    async fn delete_comment(&self, id: i64) -> Result<bool, AppError>;
}
