// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::Store;
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

/// Stored forum rows keep only the author id; usernames are joined on read.
#[derive(Debug, Clone)]
struct TopicRecord {
    id: i64,
    author_id: i64,
    title: String,
    body: String,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRecord {
    id: i64,
    topic_id: i64,
    author_id: i64,
    body: String,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    modules: BTreeMap<i64, Module>,
    quizzes: BTreeMap<i64, Quiz>,
    certificates: BTreeMap<i64, Certificate>,
    topics: BTreeMap<i64, TopicRecord>,
    comments: BTreeMap<i64, CommentRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, user_id: i64) -> String {
        self.users
            .get(&user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn topic(&self, record: &TopicRecord) -> Topic {
        Topic {
            id: record.id,
            author_id: record.author_id,
            author_username: self.username(record.author_id),
            title: record.title.clone(),
            body: record.body.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn comment(&self, record: &CommentRecord) -> Comment {
        Comment {
            id: record.id,
            topic_id: record.topic_id,
            author_id: record.author_id,
            author_username: self.username(record.author_id),
            body: record.body.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn require_user(&self, table: &str, user_id: i64) -> Result<(), AppError> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(foreign_key_violation(table))
        }
    }
}

/// Failures are phrased like PostgreSQL's so they go through the same
/// translation as the real store.
fn unique_violation(constraint: &str) -> AppError {
    AppError::from_store_message(&format!(
        "duplicate key value violates unique constraint \"{}\"",
        constraint
    ))
}

fn foreign_key_violation(table: &str) -> AppError {
    AppError::from_store_message(&format!(
        "insert or update on table \"{}\" violates foreign key constraint",
        table
    ))
}

/// In-process store used for local runs (`DATABASE_URL=memory://`) and tests.
/// Mirrors the uniqueness and foreign-key rules of the SQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(unique_violation("users_username_key"));
        }
        let id = tables.next_id();
        let created = User {
            id,
            username: user.username,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().rev().cloned().collect())
    }

    async fn update_user_role(&self, id: i64, role: Role) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        // ON DELETE CASCADE
        tables.certificates.retain(|_, c| c.user_id != id);
        tables.topics.retain(|_, t| t.author_id != id);
        let topics: Vec<i64> = tables.topics.keys().copied().collect();
        tables
            .comments
            .retain(|_, c| c.author_id != id && topics.contains(&c.topic_id));
        Ok(true)
    }

    async fn list_modules(&self, search: Option<&str>) -> Result<Vec<Module>, AppError> {
        let needle = search.map(str::to_lowercase);
        let tables = self.tables.read().await;
        Ok(tables
            .modules
            .values()
            .filter(|m| match &needle {
                Some(n) => m.title.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_module(&self, id: i64) -> Result<Option<Module>, AppError> {
        Ok(self.tables.read().await.modules.get(&id).cloned())
    }

    async fn create_module(&self, module: CreateModuleRequest) -> Result<Module, AppError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let created = Module {
            id,
            title: module.title,
            description: module.description,
            chapters: Json(module.chapters),
            image_url: module.image_url,
            created_at: now,
            updated_at: now,
        };
        tables.modules.insert(id, created.clone());
        Ok(created)
    }

    async fn update_module(
        &self,
        id: i64,
        patch: UpdateModuleRequest,
    ) -> Result<Option<Module>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(module) = tables.modules.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            module.title = title;
        }
        if let Some(description) = patch.description {
            module.description = description;
        }
        if let Some(chapters) = patch.chapters {
            module.chapters = Json(chapters);
        }
        if let Some(image_url) = patch.image_url {
            module.image_url = Some(image_url);
        }
        module.updated_at = Utc::now();
        Ok(Some(module.clone()))
    }

    async fn delete_module(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.modules.contains_key(&id) {
            return Ok(false);
        }
        // certificates.module_id is ON DELETE RESTRICT
        if tables.certificates.values().any(|c| c.module_id == id) {
            return Err(AppError::from_store_message(
                "update or delete on table \"modules\" violates foreign key constraint \
                 \"certificates_module_id_fkey\"",
            ));
        }
        tables.modules.remove(&id);
        tables.quizzes.retain(|_, q| q.module_id != id);
        Ok(true)
    }

    async fn get_quiz_for_module(&self, module_id: i64) -> Result<Option<Quiz>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .quizzes
            .values()
            .find(|q| q.module_id == module_id)
            .cloned())
    }

    async fn upsert_quiz(&self, module_id: i64, config: QuizConfig) -> Result<Quiz, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.modules.contains_key(&module_id) {
            return Err(foreign_key_violation("quizzes"));
        }
        let now = Utc::now();
        let existing = tables
            .quizzes
            .values()
            .find(|q| q.module_id == module_id)
            .map(|q| (q.id, q.created_at));
        let (id, created_at) = match existing {
            Some(found) => found,
            None => (tables.next_id(), now),
        };
        let quiz = Quiz::from_parts(id, module_id, config, created_at, now)?;
        tables.quizzes.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn delete_quiz(&self, module_id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.quizzes.len();
        tables.quizzes.retain(|_, q| q.module_id != module_id);
        Ok(tables.quizzes.len() < before)
    }

    async fn find_certificate(
        &self,
        user_id: i64,
        module_id: i64,
    ) -> Result<Option<Certificate>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .certificates
            .values()
            .find(|c| c.user_id == user_id && c.module_id == module_id)
            .cloned())
    }

    async fn find_certificate_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Certificate>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .certificates
            .values()
            .find(|c| c.certificate_number == number)
            .cloned())
    }

    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, AppError> {
        let tables = self.tables.read().await;
        let mut certificates: Vec<Certificate> = tables
            .certificates
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
        Ok(certificates)
    }

    async fn insert_certificate(
        &self,
        certificate: NewCertificate,
    ) -> Result<Certificate, AppError> {
        let mut tables = self.tables.write().await;
        tables.require_user("certificates", certificate.user_id)?;
        if !tables.modules.contains_key(&certificate.module_id) {
            return Err(foreign_key_violation("certificates"));
        }
        if tables
            .certificates
            .values()
            .any(|c| c.user_id == certificate.user_id && c.module_id == certificate.module_id)
        {
            return Err(unique_violation("certificates_user_module_key"));
        }
        let id = tables.next_id();
        let created = Certificate {
            id,
            user_id: certificate.user_id,
            module_id: certificate.module_id,
            quiz_id: certificate.quiz_id,
            certificate_number: certificate.certificate_number,
            score: certificate.score,
            issued_at: Utc::now(),
        };
        tables.certificates.insert(id, created.clone());
        Ok(created)
    }

    async fn list_topics(&self, params: &TopicListParams) -> Result<Vec<Topic>, AppError> {
        let needle = params.q.as_deref().map(str::to_lowercase);
        let tables = self.tables.read().await;
        let mut records: Vec<&TopicRecord> = tables
            .topics
            .values()
            .filter(|t| params.cursor.is_none_or(|cursor| t.created_at < cursor))
            .filter(|t| match &needle {
                Some(n) => t.title.to_lowercase().contains(n),
                None => true,
            })
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records
            .into_iter()
            .take(params.effective_limit() as usize)
            .map(|t| tables.topic(t))
            .collect())
    }

    async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.topics.get(&id).map(|t| tables.topic(t)))
    }

    async fn create_topic(
        &self,
        author_id: i64,
        title: String,
        body: String,
    ) -> Result<Topic, AppError> {
        let mut tables = self.tables.write().await;
        tables.require_user("topics", author_id)?;
        let id = tables.next_id();
        let now = Utc::now();
        let record = TopicRecord {
            id,
            author_id,
            title,
            body,
            created_at: now,
            updated_at: now,
        };
        let topic = tables.topic(&record);
        tables.topics.insert(id, record);
        Ok(topic)
    }

    async fn update_topic(
        &self,
        id: i64,
        title: Option<String>,
        body: Option<String>,
    ) -> Result<Option<Topic>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.topics.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            record.title = title;
        }
        if let Some(body) = body {
            record.body = body;
        }
        record.updated_at = Utc::now();
        let record = record.clone();
        Ok(Some(tables.topic(&record)))
    }

    async fn delete_topic(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.topics.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.topic_id != id);
        Ok(true)
    }

    async fn list_comments(&self, topic_id: i64) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        // ids grow with insertion time, so map order is creation order
        Ok(tables
            .comments
            .values()
            .filter(|c| c.topic_id == topic_id)
            .map(|c| tables.comment(c))
            .collect())
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).map(|c| tables.comment(c)))
    }

    async fn create_comment(
        &self,
        topic_id: i64,
        author_id: i64,
        body: String,
    ) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        tables.require_user("comments", author_id)?;
        if !tables.topics.contains_key(&topic_id) {
            return Err(foreign_key_violation("comments"));
        }
        let id = tables.next_id();
        let now = Utc::now();
        let record = CommentRecord {
            id,
            topic_id,
            author_id,
            body,
            created_at: now,
            updated_at: now,
        };
        let comment = tables.comment(&record);
        tables.comments.insert(id, record);
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, body: String) -> Result<Option<Comment>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.comments.get_mut(&id) else {
            return Ok(None);
        };
        record.body = body;
        record.updated_at = Utc::now();
        let record = record.clone();
        Ok(Some(tables.comment(&record)))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}
