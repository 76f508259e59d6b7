use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::accounts_client::AccountApiError;
use crate::models::signup::Field;
use crate::signup::persistence::StoreError;
use crate::signup::submission::SubmissionError;
use crate::signup::validation::ValidationErrors;
use crate::signup::wizard::{FieldChangeError, NavigationError, NextError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<Field, String>,
    },

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u32 },

    #[error("Verification link invalid: {0}")]
    VerificationLinkInvalid(String),

    #[error("Account API error: {0}")]
    AccountApi(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation {
            message: errors.first_message().to_string(),
            fields: errors.into_field_map(),
        }
    }
}

impl From<NavigationError> for AppError {
    fn from(e: NavigationError) -> Self {
        match e {
            NavigationError::Submitting => AppError::Conflict(e.to_string()),
            other => AppError::Navigation(other.to_string()),
        }
    }
}

impl From<NextError> for AppError {
    fn from(e: NextError) -> Self {
        match e {
            NextError::Invalid(errors) => errors.into(),
            NextError::Navigation(nav) => nav.into(),
        }
    }
}

impl From<FieldChangeError> for AppError {
    fn from(e: FieldChangeError) -> Self {
        match e {
            FieldChangeError::Field(field) => AppError::BadRequest(field.to_string()),
            FieldChangeError::Navigation(nav) => nav.into(),
        }
    }
}

impl From<AccountApiError> for AppError {
    fn from(e: AccountApiError) -> Self {
        AppError::AccountApi(e.to_string())
    }
}

impl From<SubmissionError> for AppError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::InFlight | SubmissionError::ResendInFlight => {
                AppError::Conflict(e.to_string())
            }
            SubmissionError::ResumeMissing => {
                let mut fields = BTreeMap::new();
                fields.insert(Field::ResumeFile, e.to_string());
                AppError::Validation {
                    message: e.to_string(),
                    fields,
                }
            }
            SubmissionError::NotComplete => AppError::Navigation(e.to_string()),
            SubmissionError::CooldownActive { remaining_secs } => {
                AppError::CooldownActive { remaining_secs }
            }
            SubmissionError::Api(api) => api.into(),
            SubmissionError::Store(store) => AppError::Store(store),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra = serde_json::Map::new();
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Validation { message, fields } => {
                extra.insert("fields".to_string(), json!(fields));
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "VALIDATION_ERROR",
                    message.clone(),
                )
            }
            AppError::Navigation(msg) => (StatusCode::CONFLICT, "NAVIGATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::CooldownActive { remaining_secs } => {
                extra.insert("remaining_secs".to_string(), json!(remaining_secs));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "COOLDOWN_ACTIVE",
                    format!("You can request another email in {remaining_secs} seconds"),
                )
            }
            AppError::VerificationLinkInvalid(msg) => {
                extra.insert("action".to_string(), json!("request_new_verification_email"));
                (StatusCode::GONE, "VERIFICATION_LINK_INVALID", msg.clone())
            }
            AppError::AccountApi(msg) => {
                tracing::warn!("Account API error: {msg}");
                (StatusCode::BAD_GATEWAY, "ACCOUNT_API_ERROR", msg.clone())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Your signup progress could not be saved".to_string(),
                )
            }
        };

        let mut error = serde_json::Map::new();
        error.insert("code".to_string(), json!(code));
        error.insert("message".to_string(), json!(message));
        error.extend(extra);

        (status, Json(json!({ "error": error }))).into_response()
    }
}
