//! Account creation and verification-email resend for a signup session.
//!
//! Both calls are single-flight: the guard flag is persisted before the
//! network call, so a second request arriving meanwhile is refused. The
//! flag is released again if the caller goes away mid-call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts_client::{AccountApi, AccountApiError, ResumeUpload};
use crate::models::signup::Field;
use crate::signup::cooldown::Cooldown;
use crate::signup::persistence::{StoreError, WelcomeSnapshot, WizardStore};
use crate::signup::reducer::{VerificationState, WizardAction, WizardState};
use crate::signup::steps::COMPLETE_STEP;
use crate::signup::wizard::Wizard;

pub const RESUME_MISSING_MESSAGE: &str = "Please select your resume again";

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("An account submission is already in progress")]
    InFlight,

    #[error("Please select your resume again")]
    ResumeMissing,

    #[error("The account has not been created yet")]
    NotComplete,

    #[error("A verification email is already being sent")]
    ResendInFlight,

    #[error("You can request another email in {remaining_secs} seconds")]
    CooldownActive { remaining_secs: u32 },

    #[error(transparent)]
    Api(#[from] AccountApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Writes `restore` back to the store unless disarmed.
///
/// Covers the window between persisting an in-flight flag and persisting the
/// outcome: a dropped handler future (client disconnect) or a failed save
/// would otherwise leave the session locked until the flag's lease expires.
struct InFlightGuard {
    store: Arc<dyn WizardStore>,
    session_id: Uuid,
    restore: Option<WizardState>,
}

impl InFlightGuard {
    fn arm(store: &Arc<dyn WizardStore>, session_id: Uuid, restore: WizardState) -> Self {
        Self {
            store: Arc::clone(store),
            session_id,
            restore: Some(restore),
        }
    }

    fn disarm(mut self) {
        self.restore = None;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let Some(state) = self.restore.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let session_id = self.session_id;
        warn!(%session_id, "in-flight request abandoned, releasing session");
        runtime.spawn(async move {
            if let Err(e) = store.save(session_id, &state).await {
                warn!(%session_id, "failed to release abandoned session: {e}");
            }
        });
    }
}

/// Creates the account for a wizard whose last input step has passed.
///
/// Success moves the wizard to the terminal step, opens the verification
/// panel with a running cooldown and stores the welcome snapshot. Failure
/// leaves the wizard on the last input step with the backend message.
pub async fn submit_account(
    store: &Arc<dyn WizardStore>,
    accounts: &dyn AccountApi,
    session_id: Uuid,
    wizard: &mut Wizard,
    cooldown_secs: u32,
    now: DateTime<Utc>,
) -> Result<(), SubmissionError> {
    if wizard.state().is_submitting {
        return Err(SubmissionError::InFlight);
    }

    let resume = match wizard.state().form_data.resume_file.clone() {
        Some(file) => match store.load_resume(session_id).await? {
            Some(bytes) => Some(ResumeUpload { file, bytes }),
            None => {
                warn!(%session_id, "resume bytes expired before submission");
                let mut errors = wizard.state().errors.clone();
                errors.insert(Field::ResumeFile, RESUME_MISSING_MESSAGE.to_string());
                wizard.dispatch(WizardAction::SetErrors(errors));
                store.save(session_id, wizard.state()).await?;
                return Err(SubmissionError::ResumeMissing);
            }
        },
        None => None,
    };

    wizard.dispatch(WizardAction::SetSubmissionError(None));
    let idle = wizard.state().clone();
    wizard.dispatch(WizardAction::SetSubmitting(Some(now)));
    store.save(session_id, wizard.state()).await?;
    let guard = InFlightGuard::arm(store, session_id, idle);

    let result = accounts
        .create_account(&wizard.state().form_data, resume)
        .await;
    wizard.dispatch(WizardAction::SetSubmitting(None));

    match result {
        Ok(_) => {
            let form = &wizard.state().form_data;
            let verification = VerificationState {
                email: form.email.trim().to_string(),
                cooldown: Cooldown::started(cooldown_secs, now),
                is_resending: false,
                resending_since: None,
            };
            store
                .save_welcome(session_id, &WelcomeSnapshot::from_form(form, now))
                .await?;

            wizard.dispatch(WizardAction::SetHighestCompletedStep(COMPLETE_STEP));
            wizard.dispatch(WizardAction::SetStep(COMPLETE_STEP));
            wizard.dispatch(WizardAction::SetVerification(Some(verification)));
            store.save(session_id, wizard.state()).await?;
            guard.disarm();
            info!(%session_id, "account created");
            Ok(())
        }
        Err(e) => {
            warn!(%session_id, "account creation failed: {e}");
            wizard.dispatch(WizardAction::SetSubmissionError(Some(e.to_string())));
            store.save(session_id, wizard.state()).await?;
            guard.disarm();
            Err(SubmissionError::Api(e))
        }
    }
}

/// Resends the verification email once the cooldown has run out.
/// During the cooldown no network call is made.
pub async fn resend_verification(
    store: &Arc<dyn WizardStore>,
    accounts: &dyn AccountApi,
    session_id: Uuid,
    wizard: &mut Wizard,
    now: DateTime<Utc>,
) -> Result<(), SubmissionError> {
    let mut verification = wizard
        .state()
        .verification
        .clone()
        .ok_or(SubmissionError::NotComplete)?;

    if verification.is_resending {
        return Err(SubmissionError::ResendInFlight);
    }
    let remaining_secs = verification.cooldown.remaining_secs(now);
    if remaining_secs > 0 {
        return Err(SubmissionError::CooldownActive { remaining_secs });
    }

    let idle = wizard.state().clone();
    verification.is_resending = true;
    verification.resending_since = Some(now);
    wizard.dispatch(WizardAction::SetVerification(Some(verification.clone())));
    store.save(session_id, wizard.state()).await?;
    let guard = InFlightGuard::arm(store, session_id, idle);

    let result = accounts.resend_verification(&verification.email).await;
    verification.is_resending = false;
    verification.resending_since = None;
    if result.is_ok() {
        verification.cooldown.restart(now);
    }
    wizard.dispatch(WizardAction::SetVerification(Some(verification)));
    store.save(session_id, wizard.state()).await?;
    guard.disarm();

    match result {
        Ok(_) => {
            info!(%session_id, "verification email resent");
            Ok(())
        }
        Err(e) => {
            warn!(%session_id, "verification resend failed: {e}");
            Err(SubmissionError::Api(e))
        }
    }
}
