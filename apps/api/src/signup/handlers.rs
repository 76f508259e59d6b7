//! Axum route handlers for the Signup Wizard API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::signup::{Field, ResumeFile};
use crate::signup::persistence::WelcomeSnapshot;
use crate::signup::submission::{resend_verification, submit_account};
use crate::signup::view::{render, WizardView};
use crate::signup::wizard::{Advance, NextError, Wizard};
use crate::state::AppState;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_RESUME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FieldChangeRequest {
    pub field: Field,
    #[serde(default)]
    pub value: Value,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn load_wizard(state: &AppState, session_id: Uuid) -> Result<Wizard, AppError> {
    let saved = state
        .store
        .load(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Signup session {session_id} not found")))?;
    let mut wizard = Wizard::from_state(saved);
    if wizard.release_stale_flags(Utc::now()) {
        warn!(%session_id, "released in-flight flag past its lease");
        state.store.save(session_id, wizard.state()).await?;
    }
    Ok(wizard)
}

async fn save_and_render(
    state: &AppState,
    session_id: Uuid,
    wizard: &Wizard,
) -> Result<Json<WizardView>, AppError> {
    state.store.save(session_id, wizard.state()).await?;
    Ok(Json(render(session_id, wizard, Utc::now())))
}

/// Applies a forward move. Passing the last input step creates the account.
async fn finish_advance(
    state: &AppState,
    session_id: Uuid,
    wizard: &mut Wizard,
    advance: Advance,
) -> Result<Json<WizardView>, AppError> {
    match advance {
        Advance::Moved(step) => {
            debug!(%session_id, step, "advanced");
            save_and_render(state, session_id, wizard).await
        }
        Advance::ReadyToSubmit => {
            submit_account(
                &state.store,
                state.accounts.as_ref(),
                session_id,
                wizard,
                state.config.resend_cooldown_secs,
                Utc::now(),
            )
            .await?;
            Ok(Json(render(session_id, wizard, Utc::now())))
        }
    }
}

fn is_allowed_resume_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_RESUME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/signup
///
/// Starts a new wizard session with empty form data.
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WizardView>), AppError> {
    let session_id = Uuid::new_v4();
    let wizard = Wizard::new();
    let view = save_and_render(&state, session_id, &wizard).await?;
    info!(%session_id, "signup session started");
    Ok((StatusCode::CREATED, view))
}

/// GET /api/v1/signup/:id
///
/// Restores a session after a reload.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let wizard = load_wizard(&state, session_id).await?;
    Ok(Json(render(session_id, &wizard, Utc::now())))
}

/// PATCH /api/v1/signup/:id/fields
pub async fn handle_field_change(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<FieldChangeRequest>,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;
    wizard.on_field_change(request.field, request.value)?;
    save_and_render(&state, session_id, &wizard).await
}

/// POST /api/v1/signup/:id/next
///
/// Validates the active step. Failures are saved into the error map before
/// the 422 is returned so a reload shows them too.
pub async fn handle_next(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;
    match wizard.on_next() {
        Ok(advance) => finish_advance(&state, session_id, &mut wizard, advance).await,
        Err(NextError::Invalid(errors)) => {
            state.store.save(session_id, wizard.state()).await?;
            Err(errors.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /api/v1/signup/:id/back
pub async fn handle_back(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;
    wizard.on_back()?;
    save_and_render(&state, session_id, &wizard).await
}

/// POST /api/v1/signup/:id/skip
pub async fn handle_skip(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;
    let advance = wizard.on_skip()?;
    finish_advance(&state, session_id, &mut wizard, advance).await
}

/// POST /api/v1/signup/:id/steps/:step
pub async fn handle_go_to_step(
    State(state): State<AppState>,
    Path((session_id, step)): Path<(Uuid, u8)>,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;
    wizard.go_to_step(step)?;
    save_and_render(&state, session_id, &wizard).await
}

/// POST /api/v1/signup/:id/resume
///
/// Multipart upload with a single `resume` part. The form data keeps only
/// the file reference; the bytes go to their own store slot.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("resume") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().trim().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read resume: {e}")))?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let (file_name, content_type, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing `resume` file part".to_string()))?;

    let reject = |message: &str| {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert(Field::ResumeFile, message.to_string());
        AppError::Validation {
            message: message.to_string(),
            fields,
        }
    };
    if file_name.is_empty() {
        return Err(reject("Please select a valid resume file"));
    }
    if !is_allowed_resume_type(&content_type) {
        return Err(reject("Resume must be a PDF, DOC or DOCX file"));
    }
    if bytes.is_empty() {
        return Err(reject("Please select a valid resume file"));
    }
    if bytes.len() > MAX_RESUME_BYTES {
        return Err(reject("Resume must be smaller than 5 MB"));
    }

    wizard.attach_resume(ResumeFile {
        file_name,
        content_type,
        size_bytes: bytes.len() as u64,
    })?;
    state.store.save_resume(session_id, bytes.to_vec()).await?;
    save_and_render(&state, session_id, &wizard).await
}

/// POST /api/v1/signup/:id/resend
pub async fn handle_resend(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let mut wizard = load_wizard(&state, session_id).await?;
    resend_verification(
        &state.store,
        state.accounts.as_ref(),
        session_id,
        &mut wizard,
        Utc::now(),
    )
    .await?;
    Ok(Json(render(session_id, &wizard, Utc::now())))
}

/// GET /api/v1/signup/:id/welcome
///
/// Returns the completed form data once, then forgets the whole session.
pub async fn handle_welcome(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WelcomeSnapshot>, AppError> {
    let snapshot = state
        .store
        .take_welcome(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No completed signup for this session".to_string()))?;
    state.store.delete(session_id).await?;
    info!(%session_id, "welcome snapshot consumed, session cleared");
    Ok(Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::build_router;
    use crate::signup::persistence::{MemoryWizardStore, WizardStore};
    use crate::signup::submission::tests::FakeAccountApi;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::Router;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            accounts_api_url: "http://accounts.test".to_string(),
            redis_url: None,
            port: 0,
            rust_log: "debug".to_string(),
            session_ttl_secs: 600,
            resend_cooldown_secs: 120,
        }
    }

    fn app_with(api: Arc<FakeAccountApi>) -> Router {
        build_router(AppState {
            store: Arc::new(MemoryWizardStore::new(600)),
            accounts: api,
            config: test_config(),
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn set(app: &Router, id: &str, field: &str, value: Value) {
        let (status, _) = call(
            app,
            "PATCH",
            &format!("/api/v1/signup/{id}/fields"),
            Some(json!({ "field": field, "value": value })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "setting {field}");
    }

    async fn start(app: &Router) -> String {
        let (status, view) = call(app, "POST", "/api/v1/signup", None).await;
        assert_eq!(status, StatusCode::CREATED);
        view["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let (status, body) = call(
            &app,
            "GET",
            &format!("/api/v1/signup/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_next_without_role_returns_field_errors_and_persists_them() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let id = start(&app).await;

        let (status, body) = call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(
            body["error"]["fields"]["role"],
            "Please select an account type"
        );

        let (_, view) = call(&app, "GET", &format!("/api/v1/signup/{id}"), None).await;
        assert_eq!(view["current_step"], 1);
        assert_eq!(view["step"]["fields"][0]["aria_invalid"], true);
    }

    #[tokio::test]
    async fn test_skip_rejected_on_required_step() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let id = start(&app).await;
        let (status, body) = call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NAVIGATION_ERROR");
    }

    #[tokio::test]
    async fn test_full_signup_then_resend_and_welcome() {
        let api = Arc::new(FakeAccountApi::default());
        let app = app_with(api.clone());
        let id = start(&app).await;

        set(&app, &id, "role", json!("jobseeker")).await;
        let (status, view) = call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["current_step"], 2);

        set(&app, &id, "full_name", json!("John Doe")).await;
        set(&app, &id, "email", json!("john@example.com")).await;
        set(&app, &id, "password", json!("Password123")).await;
        set(&app, &id, "confirmPassword", json!("Password123")).await;
        let (_, view) = call(&app, "GET", &format!("/api/v1/signup/{id}"), None).await;
        assert_eq!(view["step"]["actions"]["can_continue"], true);
        assert_eq!(view["step"]["fields"][2]["value"], Value::Null);
        assert_eq!(
            view["step"]["fields"][2]["requirements"]["has_digit"],
            true
        );

        let (_, view) = call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        assert_eq!(view["current_step"], 3);
        call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;
        let (status, view) = call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["current_step"], 6);
        assert_eq!(view["verification"]["can_resend"], false);
        assert_eq!(api.signups.load(Ordering::SeqCst), 1);

        // Cooldown still running: no network call.
        let (status, body) =
            call(&app, "POST", &format!("/api/v1/signup/{id}/resend"), None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"]["remaining_secs"].as_u64().unwrap() > 0);
        assert_eq!(api.resends.load(Ordering::SeqCst), 0);

        let (status, welcome) =
            call(&app, "GET", &format!("/api/v1/signup/{id}/welcome"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(welcome["form_data"]["full_name"], "John Doe");
        assert_eq!(welcome["form_data"]["password"], "");

        let (status, _) = call(&app, "GET", &format!("/api/v1/signup/{id}/welcome"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "GET", &format!("/api/v1/signup/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_account_creation_surfaces_message() {
        let api = Arc::new(FakeAccountApi::failing_once("Email already registered"));
        let app = app_with(api);
        let id = start(&app).await;
        set(&app, &id, "role", json!("employer")).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        for (field, value) in [
            ("full_name", "Jane Roe"),
            ("email", "jane@example.com"),
            ("password", "Password123"),
            ("confirm_password", "Password123"),
        ] {
            set(&app, &id, field, json!(value)).await;
        }
        call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/steps/3"), None).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;

        let (status, body) = call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["message"], "Email already registered");

        let (_, view) = call(&app, "GET", &format!("/api/v1/signup/{id}"), None).await;
        assert_eq!(view["current_step"], 5);
        assert_eq!(view["submission_error"], "Email already registered");
        assert_eq!(view["is_submitting"], false);
    }

    #[tokio::test]
    async fn test_dropped_submission_leaves_session_usable() {
        let api = Arc::new(FakeAccountApi {
            hang_signups: true,
            ..Default::default()
        });
        let app = app_with(api.clone());
        let id = start(&app).await;
        set(&app, &id, "role", json!("jobseeker")).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        for (field, value) in [
            ("full_name", "John Doe"),
            ("email", "john@example.com"),
            ("password", "Password123"),
            ("confirm_password", "Password123"),
        ] {
            set(&app, &id, field, json!(value)).await;
        }
        call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;
        call(&app, "POST", &format!("/api/v1/signup/{id}/skip"), None).await;

        // Client gives up while the account backend is still working.
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/signup/{id}/next"))
            .body(Body::empty())
            .unwrap();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            app.clone().oneshot(request),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(api.signups.load(Ordering::SeqCst), 1);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let (status, view) = call(&app, "POST", &format!("/api/v1/signup/{id}/back"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["current_step"], 4);
        assert_eq!(view["is_submitting"], false);

        let (status, view) = call(&app, "POST", &format!("/api/v1/signup/{id}/next"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["current_step"], 5);
    }

    #[tokio::test]
    async fn test_go_to_step_refuses_skip_ahead() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let id = start(&app).await;
        let (status, _) = call(&app, "POST", &format!("/api/v1/signup/{id}/steps/3"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_field_type_mismatch_is_bad_request() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let id = start(&app).await;
        let (status, body) = call(
            &app,
            "PATCH",
            &format!("/api/v1/signup/{id}/fields"),
            Some(json!({ "field": "email", "value": { "nested": true } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    fn multipart_request(id: &str, file_name: &str, content_type: &str, data: &str) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n--{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/signup/{id}/resume"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_resume_upload_stores_reference_and_bytes_separately() {
        let store = Arc::new(MemoryWizardStore::new(600));
        let app = build_router(AppState {
            store: store.clone(),
            accounts: Arc::new(FakeAccountApi::default()),
            config: test_config(),
        });
        let id = start(&app).await;
        let session_id: Uuid = id.parse().unwrap();

        let response = app
            .clone()
            .oneshot(multipart_request(&id, "cv.pdf", "application/pdf", "%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let saved = store.load(session_id).await.unwrap().unwrap();
        let file = saved.form_data.resume_file.unwrap();
        assert_eq!(file.file_name, "cv.pdf");
        assert_eq!(file.size_bytes, 8);
        assert_eq!(
            store.load_resume(session_id).await.unwrap(),
            Some(b"%PDF-1.4".to_vec())
        );
    }

    #[tokio::test]
    async fn test_resume_upload_rejects_unsupported_type() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let id = start(&app).await;
        let response = app
            .clone()
            .oneshot(multipart_request(&id, "photo.png", "image/png", "PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_empty_resume_upload_asks_for_valid_file() {
        let app = app_with(Arc::new(FakeAccountApi::default()));
        let id = start(&app).await;
        let response = app
            .clone()
            .oneshot(multipart_request(&id, "cv.pdf", "application/pdf", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["error"]["fields"]["resume_file"],
            "Please select a valid resume file"
        );
    }

    #[test]
    fn test_allowed_resume_types() {
        assert!(is_allowed_resume_type("application/pdf"));
        assert!(is_allowed_resume_type("Application/PDF; charset=binary"));
        assert!(!is_allowed_resume_type("image/png"));
        assert!(!is_allowed_resume_type(""));
    }
}
