use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum!(NotificationKind {
    ApplicationReceived => "application_received",
    ApplicationStatusChanged => "application_status_changed",
    ListingClosed => "listing_closed",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub listing_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
