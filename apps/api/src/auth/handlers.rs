use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub success: bool,
    pub message: String,
}

/// Backend statuses meaning the link itself is unusable.
fn is_link_rejection(status: u16) -> bool {
    matches!(status, 400 | 401 | 404 | 410 | 422)
}

/// POST /api/v1/auth/verify-email
///
/// An invalid or expired token is terminal for that link; the client is told
/// to request a new verification email.
pub async fn handle_verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<VerifyEmailResponse>, AppError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token cannot be empty".to_string()));
    }

    match state.accounts.verify_email(token).await {
        Ok(envelope) => {
            info!("email verified");
            Ok(Json(VerifyEmailResponse {
                success: true,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Your email has been verified".to_string()),
            }))
        }
        Err(e) if e.status().is_some_and(is_link_rejection) => {
            Err(AppError::VerificationLinkInvalid(e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
