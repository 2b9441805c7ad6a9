// src/models/module.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

/// Represents the 'modules' table in the database.
/// A module is one unit of educational content with an optional quiz.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: i64,
    pub title: String,
    pub description: String,

    /// Ordered chapters, stored as a JSON array.
    pub chapters: Json<Vec<Chapter>>,

    /// URL to the cover image.
    pub image_url: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub body: String,
}

/// DTO for creating a new module.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_chapters))]
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
}

/// DTO for updating a module. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateModuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_chapters))]
    pub chapters: Option<Vec<Chapter>>,
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub image_url: Option<String>,
}

impl UpdateModuleRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.chapters.is_none()
            && self.image_url.is_none()
    }
}

/// Query parameters for listing modules.
#[derive(Debug, Default, Deserialize)]
pub struct ModuleListParams {
    /// Search keyword for title match.
    pub q: Option<String>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

fn validate_chapters(chapters: &[Chapter]) -> Result<(), validator::ValidationError> {
    if chapters.len() > 200 {
        return Err(validator::ValidationError::new("too_many_chapters"));
    }
    for chapter in chapters {
        if chapter.title.trim().is_empty() || chapter.title.len() > 200 {
            return Err(validator::ValidationError::new("invalid_chapter_title"));
        }
        if chapter.body.len() > 50000 {
            return Err(validator::ValidationError::new("chapter_too_long"));
        }
    }
    Ok(())
}
