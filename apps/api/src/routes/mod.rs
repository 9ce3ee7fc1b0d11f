pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::auth::handlers as auth;
use crate::dashboard::handlers as dashboard;
use crate::favorites::handlers as favorites;
use crate::listings::handlers as listings;
use crate::matching::handlers as matching;
use crate::notifications::handlers as notifications;
use crate::profiles::handlers as profiles;
use crate::profiles::resume::MAX_RESUME_BYTES;
use crate::state::AppState;

/// Multipart framing overhead allowed on top of the resume itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/me", get(auth::handle_me))
        // Profiles
        .route(
            "/api/v1/profile",
            get(profiles::handle_get_profile).put(profiles::handle_update_profile),
        )
        .route(
            "/api/v1/profile/resume",
            post(profiles::handle_upload_resume)
                .layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/v1/businesses/:id", get(profiles::handle_get_business))
        // Listings
        .route(
            "/api/v1/listings",
            get(listings::handle_list_listings).post(listings::handle_create_listing),
        )
        .route(
            "/api/v1/listings/:id",
            get(listings::handle_get_listing)
                .put(listings::handle_update_listing)
                .delete(listings::handle_delete_listing),
        )
        .route("/api/v1/listings/:id/match", get(matching::handle_listing_match))
        .route(
            "/api/v1/listings/:id/applications",
            get(applications::handle_listing_applications).post(applications::handle_apply),
        )
        .route("/api/v1/business/listings", get(listings::handle_owned_listings))
        // Applications
        .route("/api/v1/applications", get(applications::handle_my_applications))
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application)
                .delete(applications::handle_withdraw_application),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(applications::handle_update_status),
        )
        .route(
            "/api/v1/applications/:id/match",
            get(applications::handle_application_match),
        )
        .route(
            "/api/v1/applications/:id/resume",
            get(applications::handle_application_resume),
        )
        // Favorites
        .route("/api/v1/favorites", get(favorites::handle_list_favorites))
        .route(
            "/api/v1/favorites/:listing_id",
            put(favorites::handle_add_favorite).delete(favorites::handle_remove_favorite),
        )
        // Dashboard
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::handle_list_notifications),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::handle_mark_all_read),
        )
        .route(
            "/api/v1/notifications/:id/read",
            patch(notifications::handle_mark_read),
        )
        .with_state(state)
}
