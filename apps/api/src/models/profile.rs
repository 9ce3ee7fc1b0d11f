use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SeekerProfileRow {
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub industries: Vec<String>,
    pub preferred_arrangements: Vec<String>,
    pub years_experience: Option<i32>,
    pub resume_key: Option<String>,
    /// Extracted from the uploaded PDF; fed to matching, not returned to clients.
    #[serde(skip_serializing)]
    pub resume_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BusinessProfileRow {
    pub user_id: Uuid,
    pub company_name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}
