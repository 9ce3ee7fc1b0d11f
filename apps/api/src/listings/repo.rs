use std::collections::HashSet;

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::listings::query::{push_filters, ListingFilter};
use crate::models::listing::ListingRow;

/// Upper bound on listings ranked in memory for `sort=match`.
pub const MAX_MATCH_CANDIDATES: i64 = 500;

pub async fn find_listing(pool: &PgPool, listing_id: Uuid) -> Result<ListingRow, AppError> {
    sqlx::query_as::<_, ListingRow>("SELECT * FROM listings WHERE id = $1")
        .bind(listing_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Listing {listing_id} not found")))
}

/// Inactive listings are only visible to the business that owns them.
pub fn visible_to(listing: &ListingRow, viewer: Option<&AuthUser>) -> bool {
    listing.is_active || viewer.is_some_and(|v| v.id == listing.business_id)
}

/// Another business gets 403 on a listing it can see and 404 on an
/// inactive one it cannot.
pub fn check_owner(listing: &ListingRow, caller: &AuthUser) -> Result<(), AppError> {
    if listing.business_id == caller.id {
        Ok(())
    } else if visible_to(listing, Some(caller)) {
        Err(AppError::Forbidden)
    } else {
        Err(AppError::NotFound(format!("Listing {} not found", listing.id)))
    }
}

pub async fn find_visible_listing(
    pool: &PgPool,
    listing_id: Uuid,
    viewer: Option<&AuthUser>,
) -> Result<ListingRow, AppError> {
    let listing = find_listing(pool, listing_id).await?;
    if visible_to(&listing, viewer) {
        Ok(listing)
    } else {
        Err(AppError::NotFound(format!("Listing {listing_id} not found")))
    }
}

pub async fn find_owned_listing(
    pool: &PgPool,
    listing_id: Uuid,
    owner: &AuthUser,
) -> Result<ListingRow, AppError> {
    owner.require_business()?;
    let listing = find_listing(pool, listing_id).await?;
    check_owner(&listing, owner)?;
    Ok(listing)
}

/// One page of active listings, newest first, plus the total match count.
pub async fn search_listings(
    pool: &PgPool,
    filter: &ListingFilter,
) -> Result<(Vec<ListingRow>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM listings");
    push_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM listings");
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(i64::from(filter.per_page))
        .push(" OFFSET ")
        .push_bind(filter.offset());
    let rows = select.build_query_as::<ListingRow>().fetch_all(pool).await?;

    Ok((rows, total))
}

/// Newest matching listings up to `MAX_MATCH_CANDIDATES`, for in-memory ranking.
pub async fn match_candidates(
    pool: &PgPool,
    filter: &ListingFilter,
) -> Result<Vec<ListingRow>, AppError> {
    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM listings");
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(MAX_MATCH_CANDIDATES);
    Ok(select.build_query_as::<ListingRow>().fetch_all(pool).await?)
}

/// Subset of `listing_ids` the seeker has favorited.
pub async fn favorite_ids(
    pool: &PgPool,
    seeker_id: Uuid,
    listing_ids: &[Uuid],
) -> Result<HashSet<Uuid>, AppError> {
    if listing_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT listing_id FROM favorites WHERE seeker_id = $1 AND listing_id = ANY($2)",
    )
    .bind(seeker_id)
    .bind(listing_ids)
    .fetch_all(pool)
    .await?;
    Ok(ids.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn business() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role: Role::Business,
        }
    }

    #[test]
    fn test_inactive_listing_visible_only_to_owner() {
        let owner = business();
        let other = business();
        let seeker = AuthUser {
            id: Uuid::new_v4(),
            role: Role::JobSeeker,
        };
        let closed = ListingRow::fixture(owner.id, false);

        assert!(visible_to(&closed, Some(&owner)));
        assert!(!visible_to(&closed, Some(&other)));
        assert!(!visible_to(&closed, Some(&seeker)));
        assert!(!visible_to(&closed, None));
        assert!(visible_to(&ListingRow::fixture(owner.id, true), None));
    }

    #[test]
    fn test_check_owner_hides_inactive_listings_from_other_businesses() {
        let owner = business();
        let other = business();

        let open = ListingRow::fixture(owner.id, true);
        assert!(check_owner(&open, &owner).is_ok());
        assert!(matches!(check_owner(&open, &other), Err(AppError::Forbidden)));

        let closed = ListingRow::fixture(owner.id, false);
        assert!(check_owner(&closed, &owner).is_ok());
        assert!(matches!(
            check_owner(&closed, &other),
            Err(AppError::NotFound(_))
        ));
    }
}
