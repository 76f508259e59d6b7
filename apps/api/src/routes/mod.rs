pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::signup::handlers::{self as signup, MAX_RESUME_BYTES};
use crate::state::AppState;

/// Headroom for multipart boundaries and headers around the resume part.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Signup wizard
        .route("/api/v1/signup", post(signup::handle_create_session))
        .route("/api/v1/signup/:id", get(signup::handle_get_session))
        .route(
            "/api/v1/signup/:id/fields",
            patch(signup::handle_field_change),
        )
        .route("/api/v1/signup/:id/next", post(signup::handle_next))
        .route("/api/v1/signup/:id/back", post(signup::handle_back))
        .route("/api/v1/signup/:id/skip", post(signup::handle_skip))
        .route(
            "/api/v1/signup/:id/steps/:step",
            post(signup::handle_go_to_step),
        )
        .route(
            "/api/v1/signup/:id/resume",
            post(signup::handle_upload_resume)
                .layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/v1/signup/:id/resend", post(signup::handle_resend))
        .route("/api/v1/signup/:id/welcome", get(signup::handle_welcome))
        // Email verification
        .route("/api/v1/auth/verify-email", post(auth::handle_verify_email))
        .with_state(state)
}
