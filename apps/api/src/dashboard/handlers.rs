use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::dashboard::metrics::{summarize, Dashboard};
use crate::errors::AppError;
use crate::models::application::ApplicationWithListingRow;
use crate::models::listing::ListingRow;
use crate::state::AppState;

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Dashboard>, AppError> {
    auth.require_business()?;

    let listings = sqlx::query_as::<_, ListingRow>(
        "SELECT * FROM listings WHERE business_id = $1 ORDER BY created_at DESC, id",
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    let applications = sqlx::query_as::<_, ApplicationWithListingRow>(
        r#"
        SELECT a.*, l.title AS listing_title
        FROM applications a
        JOIN listings l ON l.id = a.listing_id
        WHERE l.business_id = $1
        "#,
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(summarize(&listings, applications)))
}
