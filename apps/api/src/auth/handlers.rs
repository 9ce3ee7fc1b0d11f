use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::token::issue_token;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{Role, User, UserRow};
use crate::state::AppState;
use crate::validation::{FieldErrors, MAX_DISPLAY_NAME_LEN};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

impl RegisterRequest {
    fn validate(&self) -> Result<Role, AppError> {
        let mut errs = FieldErrors::new();
        errs.email("email", &self.email);
        errs.password("password", &self.password);
        errs.required_text("display_name", &self.display_name, MAX_DISPLAY_NAME_LEN);
        let role = errs.parse_enum("role", &self.role, Role::ALL);
        errs.into_result()?;
        role.ok_or_else(|| AppError::Validation("role is invalid".to_string()))
    }
}

/// Emails are compared case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let role = req.validate()?;
    let email = normalize_email(&req.email);
    let password_hash = hash_password_blocking(req.password.clone()).await?;

    let mut tx = state.db.begin().await?;

    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (email, password_hash, role, display_name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(role.as_str())
    .bind(req.display_name.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Email is already registered".to_string()),
        other => other,
    })?;

    match role {
        Role::JobSeeker => {
            sqlx::query("INSERT INTO seeker_profiles (user_id) VALUES ($1)")
                .bind(user.id)
                .execute(&mut *tx)
                .await?;
        }
        Role::Business => {
            sqlx::query("INSERT INTO business_profiles (user_id, company_name) VALUES ($1, $2)")
                .bind(user.id)
                .bind(req.display_name.trim())
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    info!(user_id = %user.id, role = %role, "Registered new user");

    let token = issue_token(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
        .bind(normalize_email(&req.email))
        .fetch_optional(&state.db)
        .await?;

    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified = verify_password_blocking(req.password.clone(), stored_hash).await?;
    let user = match user {
        Some(user) if verified => user,
        _ => return Err(invalid()),
    };

    let role: Role = user
        .role
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    let token = issue_token(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}
