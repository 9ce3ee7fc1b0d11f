use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::listings::repo::find_visible_listing;
use crate::matching::load_seeker_profile;
use crate::matching::scorer::{ListingSignals, MatchReport, SeekerSignals};
use crate::models::listing::ListingRow;
use crate::state::AppState;

/// Full report for one seeker against one listing. A seeker without a
/// profile row is scored as an empty profile (N/A).
pub async fn report_for(
    state: &AppState,
    seeker_id: Uuid,
    listing: &ListingRow,
) -> Result<MatchReport, AppError> {
    let seeker = load_seeker_profile(&state.db, seeker_id)
        .await?
        .as_ref()
        .map(SeekerSignals::from)
        .unwrap_or_default();
    state
        .match_scorer
        .report(&seeker, &ListingSignals::from(listing))
        .await
}

/// GET /api/v1/listings/:id/match
pub async fn handle_listing_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<MatchReport>, AppError> {
    auth.require_seeker()?;
    let listing = find_visible_listing(&state.db, listing_id, Some(&auth)).await?;
    let report = report_for(&state, auth.id, &listing).await?;
    Ok(Json(report))
}
