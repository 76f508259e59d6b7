//! Account API client: the single point of entry for calls to the external
//! account backend (signup, resend verification, verify email).
//!
//! No retries: a failed call is surfaced to the user, who retries by hand.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::signup::{ResumeFile, Role, SignupFormData};

const SIGNUP_PATH: &str = "/api/v1/auth/signup";
const RESEND_VERIFICATION_PATH: &str = "/api/v1/auth/resend-verification";
const VERIFY_EMAIL_PATH: &str = "/api/v1/auth/verify-email";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum AccountApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("JSON encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AccountApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AccountApiError::Rejected { status, .. } => Some(*status),
            AccountApiError::Http(e) => e.status().map(|s| s.as_u16()),
            AccountApiError::Encode(_) => None,
        }
    }
}

/// Success/failure envelope returned by every account endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Uploaded resume forwarded with the signup request.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file: ResumeFile,
    pub bytes: Vec<u8>,
}

/// Account creation payload: the collected form data without the
/// confirmation field. Unset optional fields are omitted.
#[derive(Debug, Serialize, PartialEq)]
pub struct SignupPayload<'a> {
    pub role: Option<Role>,
    pub full_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_file: Option<&'a ResumeFile>,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl<'a> SignupPayload<'a> {
    pub fn from_form(data: &'a SignupFormData) -> Self {
        Self {
            role: data.role,
            full_name: data.full_name.trim(),
            email: data.email.trim(),
            password: &data.password,
            phone_number: non_empty(&data.phone_number),
            city: non_empty(&data.city),
            country: non_empty(&data.country),
            job_title: non_empty(&data.job_title),
            industry: non_empty(&data.industry),
            years_of_experience: non_empty(&data.years_of_experience),
            resume_file: data.resume_file.as_ref(),
        }
    }
}

/// The account backend as seen by the signup wizard. Swap implementations
/// without touching handlers.
///
/// Carried in `AppState` as `Arc<dyn AccountApi>`.
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn create_account(
        &self,
        form: &SignupFormData,
        resume: Option<ResumeUpload>,
    ) -> Result<ApiEnvelope, AccountApiError>;

    async fn resend_verification(&self, email: &str) -> Result<ApiEnvelope, AccountApiError>;

    async fn verify_email(&self, token: &str) -> Result<ApiEnvelope, AccountApiError>;
}

#[derive(Clone)]
pub struct HttpAccountApi {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyEmailRequest<'a> {
    token: &'a str,
}

impl HttpAccountApi {
    pub fn new(base_url: &str) -> Result<Self, AccountApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Reads the envelope; non-2xx responses and `success: false` become
    /// `Rejected` carrying the backend's message verbatim.
    async fn read_envelope(response: reqwest::Response) -> Result<ApiEnvelope, AccountApiError> {
        let status = response.status();
        let body = response.text().await?;
        let envelope = serde_json::from_str::<ApiEnvelope>(&body).ok();

        if !status.is_success() {
            warn!("Account API returned {status}");
            let message = envelope
                .and_then(|e| e.message)
                .unwrap_or_else(|| fallback_message(status.as_u16(), &body));
            return Err(AccountApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        match envelope {
            Some(envelope) if envelope.success => Ok(envelope),
            Some(envelope) => Err(AccountApiError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "The request was not accepted".to_string()),
            }),
            // A 2xx without an envelope counts as success.
            None => Ok(ApiEnvelope {
                success: true,
                message: None,
            }),
        }
    }
}

fn fallback_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("Account service responded with status {status}")
    } else {
        body.to_string()
    }
}

#[async_trait]
impl AccountApi for HttpAccountApi {
    async fn create_account(
        &self,
        form: &SignupFormData,
        resume: Option<ResumeUpload>,
    ) -> Result<ApiEnvelope, AccountApiError> {
        let payload = serde_json::to_string(&SignupPayload::from_form(form))?;
        let mut body = multipart::Form::new().text("data", payload);

        if let Some(upload) = resume {
            let part = multipart::Part::bytes(upload.bytes)
                .file_name(upload.file.file_name.clone())
                .mime_str(&upload.file.content_type)?;
            body = body.part("resume", part);
        }

        debug!(
            "Creating account (role: {})",
            form.role.map(|r| r.as_str()).unwrap_or("none")
        );
        let response = self
            .client
            .post(self.url(SIGNUP_PATH))
            .multipart(body)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    async fn resend_verification(&self, email: &str) -> Result<ApiEnvelope, AccountApiError> {
        let response = self
            .client
            .post(self.url(RESEND_VERIFICATION_PATH))
            .json(&ResendRequest { email })
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    async fn verify_email(&self, token: &str) -> Result<ApiEnvelope, AccountApiError> {
        let response = self
            .client
            .post(self.url(VERIFY_EMAIL_PATH))
            .json(&VerifyEmailRequest { token })
            .send()
            .await?;
        Self::read_envelope(response).await
    }
}
