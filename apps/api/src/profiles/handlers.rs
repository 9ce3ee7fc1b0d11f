use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::listing::WorkArrangement;
use crate::models::profile::{BusinessProfileRow, SeekerProfileRow};
use crate::models::user::Role;
use crate::profiles::resume::{check_pdf, extract_resume_text, resume_key, upload_resume};
use crate::state::AppState;
use crate::validation::{
    clean_skill_list, non_blank, FieldErrors, MAX_DESCRIPTION_LEN, MAX_SHORT_TEXT_LEN,
};

const MAX_YEARS_EXPERIENCE: i32 = 70;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeekerProfileRequest {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub preferred_arrangements: Vec<String>,
    pub years_experience: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusinessProfileRequest {
    pub company_name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// The caller's own profile; shape follows the account role.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Profile {
    Seeker(SeekerProfileRow),
    Business(BusinessProfileRow),
}

#[derive(Debug, Serialize)]
pub struct PublicBusinessProfile {
    #[serde(flatten)]
    pub profile: BusinessProfileRow,
    pub active_listings: i64,
}

impl SeekerProfileRequest {
    fn validate(self) -> Result<Self, AppError> {
        let mut errs = FieldErrors::new();
        errs.optional_text("headline", self.headline.as_deref(), MAX_SHORT_TEXT_LEN);
        errs.optional_text("bio", self.bio.as_deref(), MAX_DESCRIPTION_LEN);
        errs.optional_text("location", self.location.as_deref(), MAX_SHORT_TEXT_LEN);
        errs.phone("phone", non_blank(self.phone.clone()).as_deref());
        errs.skills("skills", &self.skills);
        errs.skills("industries", &self.industries);
        for arrangement in &self.preferred_arrangements {
            if errs.has("preferred_arrangements") {
                break;
            }
            errs.parse_enum(
                "preferred_arrangements",
                arrangement.trim(),
                WorkArrangement::ALL,
            );
        }
        if self
            .years_experience
            .is_some_and(|y| !(0..=MAX_YEARS_EXPERIENCE).contains(&y))
        {
            errs.push(
                "years_experience",
                format!("must be between 0 and {MAX_YEARS_EXPERIENCE}"),
            );
        }
        errs.into_result()?;

        Ok(Self {
            headline: non_blank(self.headline),
            bio: non_blank(self.bio),
            location: non_blank(self.location),
            phone: non_blank(self.phone),
            skills: clean_skill_list(&self.skills),
            industries: clean_skill_list(&self.industries),
            preferred_arrangements: clean_skill_list(&self.preferred_arrangements),
            years_experience: self.years_experience,
        })
    }
}

impl BusinessProfileRequest {
    fn validate(self) -> Result<Self, AppError> {
        let mut errs = FieldErrors::new();
        errs.required_text("company_name", &self.company_name, MAX_SHORT_TEXT_LEN);
        errs.optional_text("industry", self.industry.as_deref(), MAX_SHORT_TEXT_LEN);
        errs.url("website", non_blank(self.website.clone()).as_deref());
        errs.optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN);
        errs.optional_text("location", self.location.as_deref(), MAX_SHORT_TEXT_LEN);
        errs.into_result()?;

        Ok(Self {
            company_name: self.company_name.trim().to_string(),
            industry: non_blank(self.industry),
            website: non_blank(self.website),
            description: non_blank(self.description),
            location: non_blank(self.location),
        })
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(format!("Invalid profile: {e}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Profile>, AppError> {
    let profile = match auth.role {
        Role::JobSeeker => Profile::Seeker(
            sqlx::query_as::<_, SeekerProfileRow>(
                "SELECT * FROM seeker_profiles WHERE user_id = $1",
            )
            .bind(auth.id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?,
        ),
        Role::Business => Profile::Business(
            sqlx::query_as::<_, BusinessProfileRow>(
                "SELECT * FROM business_profiles WHERE user_id = $1",
            )
            .bind(auth.id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Business profile not found".to_string()))?,
        ),
    };
    Ok(Json(profile))
}

/// PUT /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<Value>,
) -> Result<Json<Profile>, AppError> {
    let profile = match auth.role {
        Role::JobSeeker => {
            let req = parse_body::<SeekerProfileRequest>(body)?.validate()?;
            let row = sqlx::query_as::<_, SeekerProfileRow>(
                r#"
                INSERT INTO seeker_profiles
                    (user_id, headline, bio, location, phone, skills, industries,
                     preferred_arrangements, years_experience, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
                ON CONFLICT (user_id) DO UPDATE SET
                    headline = EXCLUDED.headline,
                    bio = EXCLUDED.bio,
                    location = EXCLUDED.location,
                    phone = EXCLUDED.phone,
                    skills = EXCLUDED.skills,
                    industries = EXCLUDED.industries,
                    preferred_arrangements = EXCLUDED.preferred_arrangements,
                    years_experience = EXCLUDED.years_experience,
                    updated_at = now()
                RETURNING *
                "#,
            )
            .bind(auth.id)
            .bind(&req.headline)
            .bind(&req.bio)
            .bind(&req.location)
            .bind(&req.phone)
            .bind(&req.skills)
            .bind(&req.industries)
            .bind(&req.preferred_arrangements)
            .bind(req.years_experience)
            .fetch_one(&state.db)
            .await?;
            Profile::Seeker(row)
        }
        Role::Business => {
            let req = parse_body::<BusinessProfileRequest>(body)?.validate()?;
            let row = sqlx::query_as::<_, BusinessProfileRow>(
                r#"
                INSERT INTO business_profiles
                    (user_id, company_name, industry, website, description, location, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, now())
                ON CONFLICT (user_id) DO UPDATE SET
                    company_name = EXCLUDED.company_name,
                    industry = EXCLUDED.industry,
                    website = EXCLUDED.website,
                    description = EXCLUDED.description,
                    location = EXCLUDED.location,
                    updated_at = now()
                RETURNING *
                "#,
            )
            .bind(auth.id)
            .bind(&req.company_name)
            .bind(&req.industry)
            .bind(&req.website)
            .bind(&req.description)
            .bind(&req.location)
            .fetch_one(&state.db)
            .await?;
            Profile::Business(row)
        }
    };

    info!(user_id = %auth.id, role = %auth.role, "Updated profile");
    Ok(Json(profile))
}

/// POST /api/v1/profile/resume (multipart field `resume`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<SeekerProfileRow>, AppError> {
    auth.require_seeker()?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("resume") {
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid resume file: {e}")))?;
            upload = Some((file_name, data));
            break;
        }
    }
    let (file_name, data) = upload
        .ok_or_else(|| AppError::Validation("Multipart field 'resume' is required".to_string()))?;
    check_pdf(file_name.as_deref(), &data)?;

    let key = resume_key(auth.id);
    upload_resume(&state.s3, &state.config.s3_bucket, &key, data.clone()).await?;
    let text = extract_resume_text(data).await;

    let row = sqlx::query_as::<_, SeekerProfileRow>(
        r#"
        INSERT INTO seeker_profiles (user_id, resume_key, resume_text, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (user_id) DO UPDATE SET
            resume_key = EXCLUDED.resume_key,
            resume_text = EXCLUDED.resume_text,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(auth.id)
    .bind(&key)
    .bind(&text)
    .fetch_one(&state.db)
    .await?;

    info!(
        user_id = %auth.id,
        resume_key = %key,
        extracted = text.is_some(),
        "Stored resume"
    );
    Ok(Json(row))
}

/// GET /api/v1/businesses/:id
pub async fn handle_get_business(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Result<Json<PublicBusinessProfile>, AppError> {
    let profile = sqlx::query_as::<_, BusinessProfileRow>(
        "SELECT * FROM business_profiles WHERE user_id = $1",
    )
    .bind(business_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Business {business_id} not found")))?;

    let active_listings: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM listings WHERE business_id = $1 AND is_active = TRUE",
    )
    .bind(business_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(PublicBusinessProfile {
        profile,
        active_listings,
    }))
}
