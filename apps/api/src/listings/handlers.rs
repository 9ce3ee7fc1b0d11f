use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::errors::AppError;
use crate::listings::query::{ListingFilter, ListingQuery, ListingSort, Page};
use crate::listings::repo::{
    favorite_ids, find_owned_listing, find_visible_listing, match_candidates, search_listings,
};
use crate::matching::scorer::compare_ranked;
use crate::matching::{load_seeker_profile, score_listings};
use crate::models::listing::{
    ApplicationMethod, EmploymentType, ListingRow, ListingView, WorkArrangement,
};
use crate::notifications::{notify_all, Notice};
use crate::state::AppState;
use crate::validation::{
    clean_skill_list, non_blank, FieldErrors, MAX_DESCRIPTION_LEN, MAX_SHORT_TEXT_LEN,
    MAX_TITLE_LEN,
};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListingRequest {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub work_arrangement: String,
    pub employment_type: String,
    pub application_method: String,
    pub external_url: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// A listing request after validation and cleanup, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidListing {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub work_arrangement: WorkArrangement,
    pub employment_type: EmploymentType,
    pub application_method: ApplicationMethod,
    pub external_url: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub is_active: bool,
}

impl ListingRequest {
    pub fn validate(self) -> Result<ValidListing, AppError> {
        let mut errs = FieldErrors::new();
        errs.required_text("title", &self.title, MAX_TITLE_LEN);
        errs.required_text("description", &self.description, MAX_DESCRIPTION_LEN);
        errs.optional_text("location", self.location.as_deref(), MAX_SHORT_TEXT_LEN);
        errs.optional_text("industry", self.industry.as_deref(), MAX_SHORT_TEXT_LEN);
        errs.skills("required_skills", &self.required_skills);
        errs.skills("preferred_skills", &self.preferred_skills);
        errs.salary_range(self.salary_min, self.salary_max);

        let work_arrangement =
            errs.parse_enum("work_arrangement", &self.work_arrangement, WorkArrangement::ALL);
        let employment_type =
            errs.parse_enum("employment_type", &self.employment_type, EmploymentType::ALL);
        let application_method = errs.parse_enum(
            "application_method",
            &self.application_method,
            ApplicationMethod::ALL,
        );

        let external_url = non_blank(self.external_url);
        match application_method {
            Some(ApplicationMethod::External) if external_url.is_none() => {
                errs.push("external_url", "is required for external applications");
            }
            Some(ApplicationMethod::Internal) if external_url.is_some() => {
                errs.push("external_url", "must be empty for internal applications");
            }
            _ => errs.url("external_url", external_url.as_deref()),
        }

        errs.into_result()?;

        match (work_arrangement, employment_type, application_method) {
            (Some(work_arrangement), Some(employment_type), Some(application_method)) => {
                Ok(ValidListing {
                    title: self.title.trim().to_string(),
                    description: self.description.trim().to_string(),
                    location: non_blank(self.location),
                    industry: non_blank(self.industry),
                    work_arrangement,
                    employment_type,
                    application_method,
                    external_url,
                    required_skills: clean_skill_list(&self.required_skills),
                    preferred_skills: clean_skill_list(&self.preferred_skills),
                    salary_min: self.salary_min,
                    salary_max: self.salary_max,
                    is_active: self.is_active,
                })
            }
            _ => Err(AppError::Validation("listing enums are invalid".to_string())),
        }
    }
}

/// Row shape for a business's own listings overview.
#[derive(Debug, Serialize, FromRow)]
pub struct OwnedListingSummary {
    pub id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub application_method: String,
    pub application_count: i64,
    pub pending_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Decoration
// ────────────────────────────────────────────────────────────────────────────

/// Attaches match scores and favorite flags for job-seeker viewers.
/// Everyone else gets `match_score: null` and `is_favorite: false`.
pub async fn decorate(
    state: &AppState,
    viewer: Option<&AuthUser>,
    listings: Vec<ListingRow>,
) -> Result<Vec<ListingView>, AppError> {
    let Some(seeker) = viewer.filter(|v| v.is_seeker()) else {
        return Ok(listings
            .into_iter()
            .map(|listing| ListingView {
                listing,
                match_score: None,
                is_favorite: false,
            })
            .collect());
    };

    let scores: HashMap<Uuid, Option<f64>> = match load_seeker_profile(&state.db, seeker.id).await? {
        Some(profile) => {
            score_listings(
                state.match_scorer.as_ref(),
                &state.match_cache,
                &profile,
                &listings,
            )
            .await
        }
        None => HashMap::new(),
    };
    let ids: Vec<Uuid> = listings.iter().map(|l| l.id).collect();
    let favorites = favorite_ids(&state.db, seeker.id, &ids).await?;

    Ok(listings
        .into_iter()
        .map(|listing| ListingView {
            match_score: scores.get(&listing.id).copied().flatten(),
            is_favorite: favorites.contains(&listing.id),
            listing,
        })
        .collect())
}

/// Sorts views best match first and cuts out the requested page.
fn rank_and_paginate(mut views: Vec<ListingView>, filter: &ListingFilter) -> Vec<ListingView> {
    views.sort_by(|a, b| {
        compare_ranked(
            (a.match_score, a.listing.created_at, a.listing.id),
            (b.match_score, b.listing.created_at, b.listing.id),
        )
    });
    views
        .into_iter()
        .skip(filter.offset() as usize)
        .take(filter.per_page as usize)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/listings
pub async fn handle_list_listings(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Page<ListingView>>, AppError> {
    let filter = ListingFilter::try_from(query)?;

    let page = match filter.sort {
        ListingSort::Newest => {
            let (rows, total) = search_listings(&state.db, &filter).await?;
            Page {
                items: decorate(&state, viewer.as_ref(), rows).await?,
                page: filter.page,
                per_page: filter.per_page,
                total,
            }
        }
        ListingSort::Match => {
            let seeker = viewer
                .filter(|v| v.is_seeker())
                .ok_or_else(|| AppError::Validation("sort=match requires a job seeker account".to_string()))?;
            let candidates = match_candidates(&state.db, &filter).await?;
            let total = candidates.len() as i64;
            let views = decorate(&state, Some(&seeker), candidates).await?;
            Page {
                items: rank_and_paginate(views, &filter),
                page: filter.page,
                per_page: filter.per_page,
                total,
            }
        }
    };

    Ok(Json(page))
}

/// GET /api/v1/listings/:id
pub async fn handle_get_listing(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<ListingView>, AppError> {
    let listing = find_visible_listing(&state.db, listing_id, viewer.as_ref()).await?;
    let view = decorate(&state, viewer.as_ref(), vec![listing])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Listing {listing_id} not found")))?;
    Ok(Json(view))
}

/// POST /api/v1/listings
pub async fn handle_create_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ListingRequest>,
) -> Result<(StatusCode, Json<ListingRow>), AppError> {
    auth.require_business()?;
    let valid = req.validate()?;

    let listing = sqlx::query_as::<_, ListingRow>(
        r#"
        INSERT INTO listings
            (business_id, title, description, location, industry, work_arrangement,
             employment_type, application_method, external_url, required_skills,
             preferred_skills, salary_min, salary_max, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(auth.id)
    .bind(&valid.title)
    .bind(&valid.description)
    .bind(&valid.location)
    .bind(&valid.industry)
    .bind(valid.work_arrangement.as_str())
    .bind(valid.employment_type.as_str())
    .bind(valid.application_method.as_str())
    .bind(&valid.external_url)
    .bind(&valid.required_skills)
    .bind(&valid.preferred_skills)
    .bind(valid.salary_min)
    .bind(valid.salary_max)
    .bind(valid.is_active)
    .fetch_one(&state.db)
    .await?;

    info!(listing_id = %listing.id, business_id = %auth.id, "Created listing");
    Ok((StatusCode::CREATED, Json(listing)))
}

/// PUT /api/v1/listings/:id
pub async fn handle_update_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
    Json(req): Json<ListingRequest>,
) -> Result<Json<ListingRow>, AppError> {
    let existing = find_owned_listing(&state.db, listing_id, &auth).await?;
    let valid = req.validate()?;

    let listing = sqlx::query_as::<_, ListingRow>(
        r#"
        UPDATE listings SET
            title = $2, description = $3, location = $4, industry = $5,
            work_arrangement = $6, employment_type = $7, application_method = $8,
            external_url = $9, required_skills = $10, preferred_skills = $11,
            salary_min = $12, salary_max = $13, is_active = $14, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(listing_id)
    .bind(&valid.title)
    .bind(&valid.description)
    .bind(&valid.location)
    .bind(&valid.industry)
    .bind(valid.work_arrangement.as_str())
    .bind(valid.employment_type.as_str())
    .bind(valid.application_method.as_str())
    .bind(&valid.external_url)
    .bind(&valid.required_skills)
    .bind(&valid.preferred_skills)
    .bind(valid.salary_min)
    .bind(valid.salary_max)
    .bind(valid.is_active)
    .fetch_one(&state.db)
    .await?;

    info!(listing_id = %listing.id, "Updated listing");

    if closes(&existing, &listing) {
        notify_pending_applicants_closed(&state, &listing).await;
    }

    Ok(Json(listing))
}

/// True when an update takes a listing from active to inactive.
fn closes(before: &ListingRow, after: &ListingRow) -> bool {
    before.is_active && !after.is_active
}

async fn notify_pending_applicants_closed(state: &AppState, listing: &ListingRow) {
    let applicants: Result<Vec<(Uuid, Uuid)>, sqlx::Error> = sqlx::query_as(
        "SELECT id, seeker_id FROM applications WHERE listing_id = $1 AND status = 'pending'",
    )
    .bind(listing.id)
    .fetch_all(&state.db)
    .await;

    match applicants {
        Ok(applicants) => {
            let notices = applicants
                .into_iter()
                .map(|(application_id, seeker_id)| {
                    Notice::listing_closed(seeker_id, &listing.title, listing.id, application_id)
                })
                .collect::<Vec<_>>();
            notify_all(&state.db, &notices).await;
        }
        Err(e) => tracing::warn!(listing_id = %listing.id, "Could not load applicants to notify: {e}"),
    }
}

/// DELETE /api/v1/listings/:id
pub async fn handle_delete_listing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    find_owned_listing(&state.db, listing_id, &auth).await?;

    sqlx::query("DELETE FROM listings WHERE id = $1")
        .bind(listing_id)
        .execute(&state.db)
        .await?;

    info!(listing_id = %listing_id, "Deleted listing");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/business/listings
pub async fn handle_owned_listings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OwnedListingSummary>>, AppError> {
    auth.require_business()?;

    let rows = sqlx::query_as::<_, OwnedListingSummary>(
        r#"
        SELECT l.id, l.title, l.is_active, l.application_method,
               COUNT(a.id) AS application_count,
               COUNT(a.id) FILTER (WHERE a.status = 'pending') AS pending_count,
               l.created_at, l.updated_at
        FROM listings l
        LEFT JOIN applications a ON a.listing_id = l.id
        WHERE l.business_id = $1
        GROUP BY l.id
        ORDER BY l.created_at DESC
        "#,
    )
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request() -> ListingRequest {
        ListingRequest {
            title: "  Senior Rust Engineer ".to_string(),
            description: "Own our matching service.".to_string(),
            location: Some("Austin, TX".to_string()),
            industry: Some("  ".to_string()),
            work_arrangement: "hybrid".to_string(),
            employment_type: "full_time".to_string(),
            application_method: "internal".to_string(),
            external_url: None,
            required_skills: vec!["Rust".to_string(), "rust".to_string(), "SQL".to_string()],
            preferred_skills: vec![],
            salary_min: Some(150_000),
            salary_max: Some(190_000),
            is_active: true,
        }
    }

    #[test]
    fn test_valid_request_is_cleaned() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.title, "Senior Rust Engineer");
        assert_eq!(valid.industry, None);
        assert_eq!(valid.required_skills, vec!["Rust", "SQL"]);
        assert_eq!(valid.work_arrangement, WorkArrangement::Hybrid);
    }

    #[test]
    fn test_external_listing_requires_url() {
        let mut req = request();
        req.application_method = "external".to_string();
        match req.validate() {
            Err(AppError::InvalidFields(fields)) => {
                assert!(fields.iter().any(|f| f.field == "external_url"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_internal_listing_rejects_url() {
        let mut req = request();
        req.external_url = Some("https://acme.io/apply".to_string());
        assert!(matches!(req.validate(), Err(AppError::InvalidFields(_))));
    }

    #[test]
    fn test_external_listing_with_url_is_valid() {
        let mut req = request();
        req.application_method = "external".to_string();
        req.external_url = Some("https://acme.io/apply".to_string());
        let valid = req.validate().unwrap();
        assert_eq!(valid.application_method, ApplicationMethod::External);
    }

    #[test]
    fn test_bad_enums_and_salary_reported_together() {
        let mut req = request();
        req.work_arrangement = "mars".to_string();
        req.employment_type = "gig".to_string();
        req.salary_min = Some(200_000);
        match req.validate() {
            Err(AppError::InvalidFields(fields)) => assert_eq!(fields.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_is_active_defaults_to_true() {
        let req: ListingRequest = serde_json::from_value(serde_json::json!({
            "title": "Barista",
            "description": "Coffee",
            "work_arrangement": "onsite",
            "employment_type": "part_time",
            "application_method": "internal"
        }))
        .unwrap();
        assert!(req.is_active);
        assert!(req.required_skills.is_empty());
    }

    fn view(score: Option<f64>, age_days: i64) -> ListingView {
        let created = Utc::now() - Duration::days(age_days);
        ListingView {
            listing: ListingRow {
                id: Uuid::new_v4(),
                business_id: Uuid::new_v4(),
                title: format!("listing {age_days}"),
                description: String::new(),
                location: None,
                industry: None,
                work_arrangement: "remote".to_string(),
                employment_type: "full_time".to_string(),
                application_method: "internal".to_string(),
                external_url: None,
                required_skills: vec![],
                preferred_skills: vec![],
                salary_min: None,
                salary_max: None,
                is_active: true,
                created_at: created,
                updated_at: created,
            },
            match_score: score,
            is_favorite: false,
        }
    }

    #[test]
    fn test_rank_and_paginate() {
        let views = vec![
            view(None, 0),
            view(Some(0.4), 1),
            view(Some(0.9), 2),
            view(Some(0.4), 0),
        ];
        let filter = ListingFilter {
            page: 1,
            per_page: 3,
            ..Default::default()
        };
        let page = rank_and_paginate(views, &filter);
        let titles: Vec<_> = page.iter().map(|v| v.listing.title.as_str()).collect();
        assert_eq!(titles, vec!["listing 2", "listing 0", "listing 1"]);

        let second = rank_and_paginate(
            vec![view(None, 0), view(Some(0.1), 0)],
            &ListingFilter {
                page: 2,
                per_page: 1,
                ..Default::default()
            },
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].match_score, None);
    }

    #[test]
    fn test_only_deactivation_closes_a_listing() {
        let owner = Uuid::new_v4();
        let open = ListingRow::fixture(owner, true);
        let closed = ListingRow::fixture(owner, false);

        assert!(closes(&open, &closed));
        assert!(!closes(&open, &open));
        assert!(!closes(&closed, &closed));
        assert!(!closes(&closed, &open));
    }
}
