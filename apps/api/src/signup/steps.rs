use serde::Serialize;

use crate::models::signup::Field;

pub const TOTAL_STEPS: u8 = 6;
/// Last step that owns fields; advancing past it creates the account.
pub const FINAL_INPUT_STEP: u8 = 5;
pub const COMPLETE_STEP: u8 = 6;

/// Static descriptor for one wizard step.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepConfig {
    pub number: u8,
    pub id: &'static str,
    pub name: &'static str,
    pub is_optional: bool,
    pub fields: &'static [Field],
}

pub static STEPS: [StepConfig; TOTAL_STEPS as usize] = [
    StepConfig {
        number: 1,
        id: "account-type",
        name: "Account Type",
        is_optional: false,
        fields: &[Field::Role],
    },
    StepConfig {
        number: 2,
        id: "create-account",
        name: "Create Account",
        is_optional: false,
        fields: &[
            Field::FullName,
            Field::Email,
            Field::Password,
            Field::ConfirmPassword,
        ],
    },
    StepConfig {
        number: 3,
        id: "contact-info",
        name: "Contact Info",
        is_optional: true,
        fields: &[Field::PhoneNumber, Field::City, Field::Country],
    },
    StepConfig {
        number: 4,
        id: "work-background",
        name: "Work Background",
        is_optional: true,
        fields: &[Field::JobTitle, Field::Industry, Field::YearsOfExperience],
    },
    StepConfig {
        number: 5,
        id: "resume-upload",
        name: "Resume Upload",
        is_optional: true,
        fields: &[Field::ResumeFile],
    },
    StepConfig {
        number: 6,
        id: "complete",
        name: "Complete",
        is_optional: false,
        fields: &[],
    },
];

/// Looks up a step by its 1-based number.
pub fn step(number: u8) -> Option<&'static StepConfig> {
    number
        .checked_sub(1)
        .and_then(|index| STEPS.get(index as usize))
}
