//! The wizard container: the single authority over navigation and field
//! mutation for one signup session.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::accounts_client::REQUEST_TIMEOUT_SECS;

use crate::models::signup::{Field, FieldError, FieldValue, ResumeFile};
use crate::signup::reducer::{reduce, WizardAction, WizardState};
use crate::signup::steps::{self, StepConfig, COMPLETE_STEP, FINAL_INPUT_STEP};
use crate::signup::validation::{validate_step, ValidationErrors};

/// How long an in-flight flag holds before a later request may release it.
/// Outlives the account API timeout so a live call is never released early.
pub const IN_FLIGHT_LEASE_SECS: i64 = REQUEST_TIMEOUT_SECS as i64 + 15;

fn lease_expired(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    since.map_or(true, |started| now - started >= Duration::seconds(IN_FLIGHT_LEASE_SECS))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Step {step} ({name}) cannot be skipped")]
    NotOptional { step: u8, name: &'static str },

    #[error("Step {target} has not been reached yet")]
    NotReached { target: u8 },

    #[error("Step {0} does not exist")]
    UnknownStep(u8),

    #[error("The account has already been created")]
    AlreadyComplete,

    #[error("An account submission is in progress")]
    Submitting,
}

/// What happened after a forward move.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Advance {
    /// Moved to the given step.
    Moved(u8),
    /// The last input step passed; the account must be created before the
    /// terminal step can be shown.
    ReadyToSubmit,
}

#[derive(Debug, Clone, Default)]
pub struct Wizard {
    state: WizardState,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: WizardState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn active_step(&self) -> &'static StepConfig {
        // current_step is always clamped to a known step by the reducer.
        steps::step(self.state.current_step).unwrap_or(&steps::STEPS[0])
    }

    pub fn is_complete(&self) -> bool {
        self.state.current_step == COMPLETE_STEP
    }

    pub fn dispatch(&mut self, action: WizardAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    /// Clears submit/resend flags whose request can no longer be running.
    /// Returns whether anything was released.
    pub fn release_stale_flags(&mut self, now: DateTime<Utc>) -> bool {
        let mut released = false;
        if self.state.is_submitting && lease_expired(self.state.submitting_since, now) {
            self.dispatch(WizardAction::SetSubmitting(None));
            released = true;
        }
        if let Some(v) = &self.state.verification {
            if v.is_resending && lease_expired(v.resending_since, now) {
                let mut v = v.clone();
                v.is_resending = false;
                v.resending_since = None;
                self.dispatch(WizardAction::SetVerification(Some(v)));
                released = true;
            }
        }
        released
    }

    fn ensure_editable(&self) -> Result<(), NavigationError> {
        if self.is_complete() {
            return Err(NavigationError::AlreadyComplete);
        }
        if self.state.is_submitting {
            return Err(NavigationError::Submitting);
        }
        Ok(())
    }

    /// Writes a raw JSON value into `field` and clears that field's error.
    /// Re-validation waits for the next advance attempt.
    pub fn on_field_change(&mut self, field: Field, value: Value) -> Result<(), FieldChangeError> {
        self.ensure_editable()?;
        let value = FieldValue::from_json(field, value)?;
        self.set_field(field, value);
        Ok(())
    }

    pub fn set_field(&mut self, field: Field, value: FieldValue) {
        self.dispatch(WizardAction::UpdateField(field, value));
    }

    /// Records an uploaded resume. The bytes are stored separately.
    pub fn attach_resume(&mut self, file: ResumeFile) -> Result<(), NavigationError> {
        self.ensure_editable()?;
        self.set_field(Field::ResumeFile, FieldValue::Resume(Some(file)));
        Ok(())
    }

    /// Live validity of the active step; does not touch the error map.
    pub fn can_continue(&self) -> bool {
        validate_step(self.state.current_step, &self.state.form_data).is_ok()
    }

    /// Validates the active step and moves forward on success.
    pub fn on_next(&mut self) -> Result<Advance, NextError> {
        self.ensure_editable()?;
        let step = self.active_step();

        if let Err(errors) = validate_step(step.number, &self.state.form_data) {
            debug!(step = step.number, issues = errors.issues.len(), "step validation failed");
            let mut map = self.state.errors.clone();
            map.extend(errors.clone().into_field_map());
            self.dispatch(WizardAction::SetErrors(map));
            return Err(NextError::Invalid(errors));
        }

        for field in step.fields {
            self.dispatch(WizardAction::ClearError(*field));
        }
        Ok(self.complete_step(step.number))
    }

    /// Moves back one step without validating. Errors are kept.
    pub fn on_back(&mut self) -> Result<u8, NavigationError> {
        self.ensure_editable()?;
        let target = self.state.current_step.saturating_sub(1).max(1);
        self.dispatch(WizardAction::SetStep(target));
        Ok(target)
    }

    /// Advances past an optional step without validating it.
    pub fn on_skip(&mut self) -> Result<Advance, NavigationError> {
        self.ensure_editable()?;
        let step = self.active_step();
        if !step.is_optional {
            return Err(NavigationError::NotOptional {
                step: step.number,
                name: step.name,
            });
        }
        Ok(self.complete_step(step.number))
    }

    /// Jumps to a step already unlocked by the watermark.
    pub fn go_to_step(&mut self, target: u8) -> Result<u8, NavigationError> {
        self.ensure_editable()?;
        if steps::step(target).is_none() {
            return Err(NavigationError::UnknownStep(target));
        }
        let limit = (self.state.highest_completed_step + 1).min(FINAL_INPUT_STEP);
        if target > limit {
            return Err(NavigationError::NotReached { target });
        }
        self.dispatch(WizardAction::SetStep(target));
        Ok(target)
    }

    fn complete_step(&mut self, number: u8) -> Advance {
        self.dispatch(WizardAction::SetHighestCompletedStep(number));
        if number >= FINAL_INPUT_STEP {
            return Advance::ReadyToSubmit;
        }
        let target = number + 1;
        self.dispatch(WizardAction::SetStep(target));
        Advance::Moved(target)
    }
}

#[derive(Debug, Error)]
pub enum NextError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

#[derive(Debug, Error)]
pub enum FieldChangeError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),
}
