use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::signup::Field;
use crate::signup::fields::{field_view, FieldView};
use crate::signup::steps::{StepConfig, COMPLETE_STEP, STEPS};
use crate::signup::wizard::Wizard;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Available,
    Locked,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub number: u8,
    pub id: &'static str,
    pub name: &'static str,
    pub is_optional: bool,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepActions {
    pub can_continue: bool,
    pub can_go_back: bool,
    pub can_skip: bool,
}

/// The active step, bound to its slice of form data.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub number: u8,
    pub id: &'static str,
    pub name: &'static str,
    pub fields: Vec<FieldView>,
    pub actions: StepActions,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationView {
    pub email: String,
    pub resend_available_in_secs: u32,
    pub can_resend: bool,
    pub is_resending: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub session_id: Uuid,
    pub current_step: u8,
    pub highest_completed_step: u8,
    pub steps: Vec<StepSummary>,
    pub step: StepView,
    pub errors: BTreeMap<Field, String>,
    pub is_submitting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationView>,
}

fn status_of(step: &StepConfig, wizard: &Wizard) -> StepStatus {
    let state = wizard.state();
    if step.number == state.current_step {
        StepStatus::Current
    } else if step.number <= state.highest_completed_step {
        StepStatus::Completed
    } else if step.number == state.highest_completed_step + 1 && step.number != COMPLETE_STEP {
        StepStatus::Available
    } else {
        StepStatus::Locked
    }
}

pub fn render(session_id: Uuid, wizard: &Wizard, now: DateTime<Utc>) -> WizardView {
    let state = wizard.state();
    let active = wizard.active_step();
    let frozen = wizard.is_complete() || state.is_submitting;

    let fields = active
        .fields
        .iter()
        .map(|field| {
            field_view(
                *field,
                &state.form_data,
                state.errors.get(field).map(String::as_str),
                state.is_submitting,
            )
        })
        .collect();

    let step = StepView {
        number: active.number,
        id: active.id,
        name: active.name,
        fields,
        actions: StepActions {
            can_continue: !frozen && wizard.can_continue(),
            can_go_back: !frozen && active.number > 1,
            can_skip: !frozen && active.is_optional,
        },
    };

    let verification = state.verification.as_ref().map(|v| {
        let remaining = v.cooldown.remaining_secs(now);
        VerificationView {
            email: v.email.clone(),
            resend_available_in_secs: remaining,
            can_resend: v.cooldown.is_ready(now) && !v.is_resending,
            is_resending: v.is_resending,
        }
    });

    WizardView {
        session_id,
        current_step: state.current_step,
        highest_completed_step: state.highest_completed_step,
        steps: STEPS
            .iter()
            .map(|s| StepSummary {
                number: s.number,
                id: s.id,
                name: s.name,
                is_optional: s.is_optional,
                status: status_of(s, wizard),
            })
            .collect(),
        step,
        errors: state.errors.clone(),
        is_submitting: state.is_submitting,
        submission_error: state.submission_error.clone(),
        verification,
    }
}
