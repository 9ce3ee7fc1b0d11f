use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::applications::status::{can_withdraw, check_transition, Transition};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::listings::repo::{find_listing, find_owned_listing};
use crate::matching::handlers::report_for;
use crate::matching::load_seeker_profile;
use crate::matching::scorer::{ListingSignals, MatchReport, SeekerSignals};
use crate::models::application::{ApplicationRow, ApplicationStatus, ApplicationWithListingRow};
use crate::models::listing::ListingRow;
use crate::notifications::{notify, Notice};
use crate::profiles::resume::{presign_resume, RESUME_URL_TTL_SECS};
use crate::state::AppState;
use crate::validation::{
    non_blank, FieldErrors, MAX_COVER_LETTER_LEN, MAX_DISPLAY_NAME_LEN,
};

const APPLICATION_WITH_TITLE: &str = r#"
    SELECT a.*, l.title AS listing_title
    FROM applications a
    JOIN listings l ON l.id = a.listing_id
"#;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub cover_letter: Option<String>,
}

impl ApplyRequest {
    fn validate(self) -> Result<Self, AppError> {
        let mut errs = FieldErrors::new();
        errs.required_text("full_name", &self.full_name, MAX_DISPLAY_NAME_LEN);
        errs.email("email", &self.email);
        errs.phone("phone", non_blank(self.phone.clone()).as_deref());
        errs.optional_text(
            "cover_letter",
            self.cover_letter.as_deref(),
            MAX_COVER_LETTER_LEN,
        );
        errs.into_result()?;

        Ok(Self {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: non_blank(self.phone),
            cover_letter: non_blank(self.cover_letter),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ResumeUrlResponse {
    pub url: String,
    pub expires_in_secs: u64,
}

/// How the caller relates to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Viewer {
    Applicant,
    Owner,
}

/// Closed listings and external-apply listings refuse in-app applications.
fn apply_gate(listing: &ListingRow) -> Result<(), AppError> {
    if !listing.is_active {
        return Err(AppError::UnprocessableEntity(
            "This listing is no longer accepting applications".to_string(),
        ));
    }
    if !listing.accepts_internal_applications() {
        return Err(AppError::UnprocessableEntity(
            "This listing takes applications on the employer's site".to_string(),
        ));
    }
    Ok(())
}

fn parse_status(field: &str, value: &str) -> Result<ApplicationStatus, AppError> {
    let mut errs = FieldErrors::new();
    let status = errs.parse_enum(field, value.trim(), ApplicationStatus::ALL);
    errs.into_result()?;
    status.ok_or_else(|| AppError::Validation(format!("{field} is invalid")))
}

fn stored_status(row: &ApplicationRow) -> Result<ApplicationStatus, AppError> {
    row.status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

/// Loads an application with its listing, visible only to the applicant
/// and the listing owner. Anyone else gets 404.
async fn load_for_viewer(
    state: &AppState,
    application_id: Uuid,
    auth: &AuthUser,
) -> Result<(ApplicationWithListingRow, ListingRow, Viewer), AppError> {
    let not_found = || AppError::NotFound(format!("Application {application_id} not found"));

    let row = sqlx::query_as::<_, ApplicationWithListingRow>(&format!(
        "{APPLICATION_WITH_TITLE} WHERE a.id = $1"
    ))
    .bind(application_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(not_found)?;
    let listing = find_listing(&state.db, row.application.listing_id).await?;

    let viewer = if row.application.seeker_id == auth.id {
        Viewer::Applicant
    } else if listing.business_id == auth.id {
        Viewer::Owner
    } else {
        return Err(not_found());
    };
    Ok((row, listing, viewer))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/listings/:id/applications
pub async fn handle_apply(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    auth.require_seeker()?;
    let req = req.validate()?;

    let listing = find_listing(&state.db, listing_id).await?;
    apply_gate(&listing)?;

    let profile = load_seeker_profile(&state.db, auth.id).await?;
    let seeker = profile
        .as_ref()
        .map(SeekerSignals::from)
        .unwrap_or_default();
    let match_score = state
        .match_scorer
        .score(&seeker, &ListingSignals::from(&listing));
    let resume_key = profile.and_then(|p| p.resume_key);

    let application = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications
            (listing_id, seeker_id, full_name, email, phone, resume_key, cover_letter, match_score)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(listing.id)
    .bind(auth.id)
    .bind(&req.full_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&resume_key)
    .bind(&req.cover_letter)
    .bind(match_score)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict("You have already applied to this listing".to_string())
        }
        other => other,
    })?;

    info!(
        application_id = %application.id,
        listing_id = %listing.id,
        seeker_id = %auth.id,
        match_score = ?application.match_score,
        "Application submitted"
    );

    notify(
        &state.db,
        &Notice::application_received(
            listing.business_id,
            &application.full_name,
            &listing.title,
            listing.id,
            application.id,
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ApplicationWithListingRow>>, AppError> {
    auth.require_seeker()?;

    let rows = sqlx::query_as::<_, ApplicationWithListingRow>(&format!(
        "{APPLICATION_WITH_TITLE} WHERE a.seeker_id = $1 ORDER BY a.created_at DESC, a.id"
    ))
    .bind(auth.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// GET /api/v1/listings/:id/applications
pub async fn handle_listing_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<Uuid>,
    Query(query): Query<ApplicationsQuery>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    find_owned_listing(&state.db, listing_id, &auth).await?;
    let status = non_blank(query.status)
        .map(|s| parse_status("status", &s))
        .transpose()?;

    let rows = sqlx::query_as::<_, ApplicationRow>(
        r#"
        SELECT * FROM applications
        WHERE listing_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY match_score DESC NULLS LAST, created_at DESC, id
        "#,
    )
    .bind(listing_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ApplicationWithListingRow>, AppError> {
    let (row, _, _) = load_for_viewer(&state, application_id, &auth).await?;
    Ok(Json(row))
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    auth.require_business()?;
    let target = parse_status("status", &req.status)?;

    let (row, listing, viewer) = load_for_viewer(&state, application_id, &auth).await?;
    if viewer != Viewer::Owner {
        return Err(AppError::Forbidden);
    }
    let current = stored_status(&row.application)?;

    if check_transition(current, target)? == Transition::Unchanged {
        return Ok(Json(row.application));
    }

    // Guarded on the old status so a concurrent update cannot be overwritten.
    let updated = sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET status = $2, updated_at = now()
        WHERE id = $1 AND status = $3
        RETURNING *
        "#,
    )
    .bind(application_id)
    .bind(target.as_str())
    .bind(current.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::Conflict("Application status changed concurrently; reload and retry".to_string())
    })?;

    info!(
        application_id = %application_id,
        from = %current,
        to = %target,
        "Application status changed"
    );

    notify(
        &state.db,
        &Notice::status_changed(
            updated.seeker_id,
            &listing.title,
            target,
            listing.id,
            updated.id,
        ),
    )
    .await;

    Ok(Json(updated))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_withdraw_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (row, _, viewer) = load_for_viewer(&state, application_id, &auth).await?;
    if viewer != Viewer::Applicant {
        return Err(AppError::Forbidden);
    }
    if !can_withdraw(stored_status(&row.application)?) {
        return Err(AppError::UnprocessableEntity(
            "Only pending applications can be withdrawn".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND status = 'pending'")
        .bind(application_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::UnprocessableEntity(
            "Only pending applications can be withdrawn".to_string(),
        ));
    }

    info!(application_id = %application_id, seeker_id = %auth.id, "Application withdrawn");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/applications/:id/match
pub async fn handle_application_match(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<MatchReport>, AppError> {
    let (row, listing, _) = load_for_viewer(&state, application_id, &auth).await?;
    let report = report_for(&state, row.application.seeker_id, &listing).await?;
    Ok(Json(report))
}

/// GET /api/v1/applications/:id/resume
pub async fn handle_application_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ResumeUrlResponse>, AppError> {
    let (row, _, _) = load_for_viewer(&state, application_id, &auth).await?;
    let key = row
        .application
        .resume_key
        .ok_or_else(|| AppError::NotFound("This application has no resume".to_string()))?;

    let url = presign_resume(&state.s3, &state.config.s3_bucket, &key).await?;
    Ok(Json(ResumeUrlResponse {
        url,
        expires_in_secs: RESUME_URL_TTL_SECS,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply() -> ApplyRequest {
        ApplyRequest {
            full_name: " Dana Ruiz ".to_string(),
            email: " Dana@Example.com ".to_string(),
            phone: Some("".to_string()),
            cover_letter: Some("I love coffee.".to_string()),
        }
    }

    #[test]
    fn test_apply_request_is_cleaned() {
        let req = apply().validate().unwrap();
        assert_eq!(req.full_name, "Dana Ruiz");
        assert_eq!(req.email, "dana@example.com");
        assert_eq!(req.phone, None);
    }

    #[test]
    fn test_apply_request_rejects_long_cover_letter() {
        let mut req = apply();
        req.cover_letter = Some("x".repeat(MAX_COVER_LETTER_LEN + 1));
        req.email = "nope".to_string();
        match req.validate() {
            Err(AppError::InvalidFields(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["email", "cover_letter"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            parse_status("status", " reviewed ").unwrap(),
            ApplicationStatus::Reviewed
        );
        assert!(matches!(
            parse_status("status", "hired"),
            Err(AppError::InvalidFields(_))
        ));
    }

    #[test]
    fn test_apply_gate() {
        let open = ListingRow::fixture(Uuid::new_v4(), true);
        assert!(apply_gate(&open).is_ok());

        let closed = ListingRow {
            is_active: false,
            ..open.clone()
        };
        assert!(matches!(
            apply_gate(&closed),
            Err(AppError::UnprocessableEntity(msg)) if msg.contains("no longer accepting")
        ));

        let external = ListingRow {
            application_method: "external".to_string(),
            external_url: Some("https://jobs.example.com/42".to_string()),
            ..open
        };
        assert!(matches!(
            apply_gate(&external),
            Err(AppError::UnprocessableEntity(msg)) if msg.contains("employer's site")
        ));
    }
}
