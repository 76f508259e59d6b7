//! Wizard state and its pure transition function.
//!
//! Every mutation of a signup session goes through [`reduce`], so the whole
//! history of a session is a sequence of [`WizardAction`]s that can be
//! replayed and tested without HTTP or storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::signup::{Field, FieldValue, SignupFormData};
use crate::signup::cooldown::Cooldown;
use crate::signup::steps::TOTAL_STEPS;

/// "Verify your email" panel shown once the account exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationState {
    pub email: String,
    pub cooldown: Cooldown,
    pub is_resending: bool,
    /// When the in-flight resend started; a stale lease is released on load.
    #[serde(default)]
    pub resending_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WizardState {
    /// 1-based, always within `1..=TOTAL_STEPS`.
    pub current_step: u8,
    /// Farthest step validated or skipped. Never decreases.
    pub highest_completed_step: u8,
    pub form_data: SignupFormData,
    pub errors: BTreeMap<Field, String>,
    pub is_submitting: bool,
    #[serde(default)]
    pub submitting_since: Option<DateTime<Utc>>,
    pub submission_error: Option<String>,
    pub verification: Option<VerificationState>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current_step: 1,
            highest_completed_step: 0,
            form_data: SignupFormData::default(),
            errors: BTreeMap::new(),
            is_submitting: false,
            submitting_since: None,
            submission_error: None,
            verification: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WizardAction {
    SetStep(u8),
    UpdateField(Field, FieldValue),
    SetErrors(BTreeMap<Field, String>),
    ClearError(Field),
    /// `Some(started_at)` marks an account submission in flight.
    SetSubmitting(Option<DateTime<Utc>>),
    SetHighestCompletedStep(u8),
    SetSubmissionError(Option<String>),
    SetVerification(Option<VerificationState>),
    Reset,
}

fn clamp_step(step: u8) -> u8 {
    step.clamp(1, TOTAL_STEPS)
}

pub fn reduce(state: WizardState, action: WizardAction) -> WizardState {
    match action {
        WizardAction::SetStep(step) => WizardState {
            current_step: clamp_step(step),
            ..state
        },
        WizardAction::UpdateField(field, value) => {
            let mut next = state;
            // Kind mismatches are rejected before dispatch; a stray one is a no-op.
            if next.form_data.set(field, value).is_ok() {
                next.errors.remove(&field);
            }
            next
        }
        WizardAction::SetErrors(errors) => WizardState { errors, ..state },
        WizardAction::ClearError(field) => {
            let mut next = state;
            next.errors.remove(&field);
            next
        }
        WizardAction::SetSubmitting(since) => WizardState {
            is_submitting: since.is_some(),
            submitting_since: since,
            ..state
        },
        WizardAction::SetHighestCompletedStep(step) => WizardState {
            highest_completed_step: state.highest_completed_step.max(step.min(TOTAL_STEPS)),
            ..state
        },
        WizardAction::SetSubmissionError(submission_error) => WizardState {
            submission_error,
            ..state
        },
        WizardAction::SetVerification(verification) => WizardState {
            verification,
            ..state
        },
        WizardAction::Reset => WizardState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let s = WizardState::default();
        assert_eq!(s.current_step, 1);
        assert_eq!(s.highest_completed_step, 0);
        assert_eq!(s.form_data, SignupFormData::default());
        assert!(s.errors.is_empty());
        assert!(!s.is_submitting);
    }

    #[test]
    fn test_set_step_is_clamped() {
        let s = reduce(WizardState::default(), WizardAction::SetStep(0));
        assert_eq!(s.current_step, 1);
        let s = reduce(s, WizardAction::SetStep(42));
        assert_eq!(s.current_step, TOTAL_STEPS);
    }

    #[test]
    fn test_update_field_clears_that_fields_error() {
        let mut errors = BTreeMap::new();
        errors.insert(Field::Email, "Email is required".to_string());
        errors.insert(Field::FullName, "Full name is required".to_string());
        let s = reduce(WizardState::default(), WizardAction::SetErrors(errors));
        let s = reduce(
            s,
            WizardAction::UpdateField(Field::Email, FieldValue::Text("a@b.co".to_string())),
        );
        assert_eq!(s.form_data.email, "a@b.co");
        assert!(!s.errors.contains_key(&Field::Email));
        assert!(s.errors.contains_key(&Field::FullName));
    }

    #[test]
    fn test_mismatched_update_is_ignored() {
        let before = WizardState::default();
        let after = reduce(
            before.clone(),
            WizardAction::UpdateField(Field::Role, FieldValue::Text("x".to_string())),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_highest_completed_step_never_lowers() {
        let s = reduce(
            WizardState::default(),
            WizardAction::SetHighestCompletedStep(4),
        );
        let s = reduce(s, WizardAction::SetHighestCompletedStep(2));
        assert_eq!(s.highest_completed_step, 4);
        let s = reduce(s, WizardAction::SetHighestCompletedStep(200));
        assert_eq!(s.highest_completed_step, TOTAL_STEPS);
    }

    #[test]
    fn test_clear_error_and_reset() {
        let mut errors = BTreeMap::new();
        errors.insert(Field::Role, "Please select an account type".to_string());
        let s = reduce(WizardState::default(), WizardAction::SetErrors(errors));
        let s = reduce(s, WizardAction::ClearError(Field::Role));
        assert!(s.errors.is_empty());

        let s = reduce(s, WizardAction::SetStep(4));
        let s = reduce(s, WizardAction::SetSubmitting(Some(Utc::now())));
        assert!(s.is_submitting);
        assert_eq!(reduce(s, WizardAction::Reset), WizardState::default());
    }

    #[test]
    fn test_set_submitting_tracks_start_time() {
        let t0 = Utc::now();
        let s = reduce(WizardState::default(), WizardAction::SetSubmitting(Some(t0)));
        assert!(s.is_submitting);
        assert_eq!(s.submitting_since, Some(t0));
        let s = reduce(s, WizardAction::SetSubmitting(None));
        assert!(!s.is_submitting);
        assert!(s.submitting_since.is_none());
    }

    #[test]
    fn test_state_serde_round_trip_keeps_error_keys() {
        let mut errors = BTreeMap::new();
        errors.insert(Field::ConfirmPassword, "Passwords do not match".to_string());
        let s = reduce(WizardState::default(), WizardAction::SetErrors(errors));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(
            json["errors"]["confirm_password"],
            serde_json::json!("Passwords do not match")
        );
        let back: WizardState = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
