use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::notification::NotificationRow;
use crate::state::AppState;

const MAX_NOTIFICATIONS: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// GET /api/v1/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
        ORDER BY created_at DESC, id
        LIMIT $3
        "#,
    )
    .bind(auth.id)
    .bind(query.unread_only)
    .bind(MAX_NOTIFICATIONS)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// PATCH /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(notification_id)
        .bind(auth.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Notification {notification_id} not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
            .bind(auth.id)
            .execute(&state.db)
            .await?;

    Ok(Json(MarkAllReadResponse {
        updated: result.rows_affected(),
    }))
}
