// src/models/certificate.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'certificates' table in the database.
/// Issued once per (user, module) and never mutated afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    pub user_id: i64,
    pub module_id: i64,
    pub quiz_id: i64,

    /// Human-readable number, e.g. `CERT-LZ3K8Q1A-7F2X`.
    pub certificate_number: String,

    /// Awarded score percentage (0-100).
    pub score: i16,

    pub issued_at: chrono::DateTime<chrono::Utc>,
}

/// Insert payload for a new certificate.
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub user_id: i64,
    pub module_id: i64,
    pub quiz_id: i64,
    pub certificate_number: String,
    pub score: i16,
}
