use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::listings::handlers::decorate;
use crate::listings::repo::find_visible_listing;
use crate::models::listing::{ListingRow, ListingView};
use crate::state::AppState;

/// GET /api/v1/favorites
pub async fn handle_list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ListingView>>, AppError> {
    auth.require_seeker()?;

    let listings = sqlx::query_as::<_, ListingRow>(
        r#"
        SELECT l.* FROM favorites f
        JOIN listings l ON l.id = f.listing_id
        WHERE f.seeker_id = $1
        ORDER BY f.created_at DESC, l.id
        "#,
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let views = decorate(&state, Some(&auth), listings).await?;
    Ok(Json(views))
}

/// PUT /api/v1/favorites/:listing_id
pub async fn handle_add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_seeker()?;
    find_visible_listing(&state.db, listing_id, Some(&auth)).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO favorites (seeker_id, listing_id) VALUES ($1, $2)
        ON CONFLICT (seeker_id, listing_id) DO NOTHING
        "#,
    )
    .bind(auth.id)
    .bind(listing_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() > 0 {
        info!(seeker_id = %auth.id, listing_id = %listing_id, "Favorited listing");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/favorites/:listing_id
pub async fn handle_remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_seeker()?;

    sqlx::query("DELETE FROM favorites WHERE seeker_id = $1 AND listing_id = $2")
        .bind(auth.id)
        .bind(listing_id)
        .execute(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
