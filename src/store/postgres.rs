// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use super::Store;
use crate::{
    error::AppError,
    models::{
        certificate::{Certificate, NewCertificate},
        comment::Comment,
        module::{CreateModuleRequest, Module, UpdateModuleRequest},
        quiz::{Question, Quiz, QuizConfig},
        topic::{Topic, TopicListParams},
        user::{NewUser, Role, User},
    },
};

const MODULE_COLUMNS: &str =
    "id, title, description, chapters, image_url, created_at, updated_at";

const QUIZ_COLUMNS: &str =
    "id, module_id, title, passing_score, questions, created_at, updated_at";

const CERTIFICATE_COLUMNS: &str =
    "id, user_id, module_id, quiz_id, certificate_number, score, issued_at";

const TOPIC_SELECT: &str = r#"
    SELECT t.id, t.author_id, u.username AS author_username,
           t.title, t.body, t.created_at, t.updated_at
    FROM topics t
    JOIN users u ON u.id = t.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.topic_id, c.author_id, u.username AS author_username,
           c.body, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Helper row for the 'users' table; `role` is stored as text.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(AppError::InternalServerError)?;
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            role,
            created_at: row.created_at,
        })
    }
}

/// Helper row for the 'quizzes' table. Questions are re-validated on decode.
#[derive(FromRow)]
struct QuizRow {
    id: i64,
    module_id: i64,
    title: String,
    passing_score: i16,
    questions: Json<Vec<Question>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = AppError;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let config = QuizConfig {
            title: row.title,
            passing_score: i64::from(row.passing_score),
            questions: row.questions.0,
        };
        Quiz::from_parts(row.id, row.module_id, config, row.created_at, row.updated_at).map_err(
            |e| {
                AppError::InternalServerError(format!("stored quiz {} is invalid: {}", row.id, e))
            },
        )
    }
}

/// `ILIKE` pattern matching `keyword` literally anywhere in the text.
fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, role, created_at FROM users ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn update_user_role(&self, id: i64, role: Role) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_modules(&self, search: Option<&str>) -> Result<Vec<Module>, AppError> {
        let pattern = search.map(contains_pattern);
        let modules = sqlx::query_as::<_, Module>(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules
             WHERE ($1::TEXT IS NULL OR title ILIKE $1 ESCAPE '\\')
             ORDER BY id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    async fn get_module(&self, id: i64) -> Result<Option<Module>, AppError> {
        let module = sqlx::query_as::<_, Module>(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(module)
    }

    async fn create_module(&self, module: CreateModuleRequest) -> Result<Module, AppError> {
        let created = sqlx::query_as::<_, Module>(&format!(
            "INSERT INTO modules (title, description, chapters, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING {MODULE_COLUMNS}"
        ))
        .bind(&module.title)
        .bind(&module.description)
        .bind(Json(&module.chapters))
        .bind(&module.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_module(
        &self,
        id: i64,
        patch: UpdateModuleRequest,
    ) -> Result<Option<Module>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE modules SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = patch.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(description) = patch.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(chapters) = patch.chapters {
            separated.push("chapters = ");
            separated.push_bind_unseparated(Json(chapters));
        }

        if let Some(image_url) = patch.image_url {
            separated.push("image_url = ");
            separated.push_bind_unseparated(image_url);
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {MODULE_COLUMNS}"));

        let updated = builder
            .build_query_as::<Module>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_module(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_quiz_for_module(&self, module_id: i64) -> Result<Option<Quiz>, AppError> {
        sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE module_id = $1"
        ))
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Quiz::try_from)
        .transpose()
    }

    async fn upsert_quiz(&self, module_id: i64, config: QuizConfig) -> Result<Quiz, AppError> {
        config.validate()?;

        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "INSERT INTO quizzes (module_id, title, passing_score, questions)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (module_id) DO UPDATE SET
                 title = EXCLUDED.title,
                 passing_score = EXCLUDED.passing_score,
                 questions = EXCLUDED.questions,
                 updated_at = NOW()
             RETURNING {QUIZ_COLUMNS}"
        ))
        .bind(module_id)
        .bind(&config.title)
        .bind(config.passing_score as i16)
        .bind(Json(&config.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert quiz for module {}: {:?}", module_id, e);
            AppError::from(e)
        })?;

        row.try_into()
    }

    async fn delete_quiz(&self, module_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE module_id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_certificate(
        &self,
        user_id: i64,
        module_id: i64,
    ) -> Result<Option<Certificate>, AppError> {
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates
             WHERE user_id = $1 AND module_id = $2"
        ))
        .bind(user_id)
        .bind(module_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(certificate)
    }

    async fn find_certificate_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Certificate>, AppError> {
        // Numbers are not unique-constrained; the oldest match wins.
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates
             WHERE certificate_number = $1
             ORDER BY id
             LIMIT 1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(certificate)
    }

    async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>, AppError> {
        let certificates = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates
             WHERE user_id = $1
             ORDER BY issued_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(certificates)
    }

    async fn insert_certificate(
        &self,
        certificate: NewCertificate,
    ) -> Result<Certificate, AppError> {
        let created = sqlx::query_as::<_, Certificate>(&format!(
            "INSERT INTO certificates (user_id, module_id, quiz_id, certificate_number, score)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(certificate.user_id)
        .bind(certificate.module_id)
        .bind(certificate.quiz_id)
        .bind(&certificate.certificate_number)
        .bind(certificate.score)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_topics(&self, params: &TopicListParams) -> Result<Vec<Topic>, AppError> {
        let pattern = params.q.as_deref().map(contains_pattern);
        let topics = sqlx::query_as::<_, Topic>(&format!(
            "{TOPIC_SELECT}
             WHERE ($1::TIMESTAMPTZ IS NULL OR t.created_at < $1)
               AND ($2::TEXT IS NULL OR t.title ILIKE $2 ESCAPE '\\')
             ORDER BY t.created_at DESC, t.id DESC
             LIMIT $3"
        ))
        .bind(params.cursor)
        .bind(pattern)
        .bind(params.effective_limit())
        .fetch_all(&self.pool)
        .await?;
        Ok(topics)
    }

    async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError> {
        let topic = sqlx::query_as::<_, Topic>(&format!("{TOPIC_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(topic)
    }

    async fn create_topic(
        &self,
        author_id: i64,
        title: String,
        body: String,
    ) -> Result<Topic, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO topics (author_id, title, body) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(author_id)
        .bind(title)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        self.get_topic(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
    }

    async fn update_topic(
        &self,
        id: i64,
        title: Option<String>,
        body: Option<String>,
    ) -> Result<Option<Topic>, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE topics SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_topic(id).await
    }

    async fn delete_topic(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, topic_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.topic_id = $1 ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn create_comment(
        &self,
        topic_id: i64,
        author_id: i64,
        body: String,
    ) -> Result<Comment, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (topic_id, author_id, body) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(topic_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    async fn update_comment(&self, id: i64, body: String) -> Result<Option<Comment>, AppError> {
        let result =
            sqlx::query("UPDATE comments SET body = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(body)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_comment(id).await
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
