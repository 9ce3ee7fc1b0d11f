use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(ApplicationStatus {
    Pending => "pending",
    Reviewed => "reviewed",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub seeker_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_key: Option<String>,
    pub cover_letter: Option<String>,
    pub status: String,
    /// Snapshot taken at submission time; `null` renders as N/A.
    pub match_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with the title of the listing it targets.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationWithListingRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub listing_title: String,
}
