//! Field primitives: the presentation and accessibility contract for each
//! input, emitted as data so any front end can render it.

use serde::Serialize;

use crate::models::signup::{Field, SignupFormData};
use crate::signup::validation::MIN_PASSWORD_CHARS;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Email,
    Tel,
    Password,
    Select,
    RoleCards,
    File,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Live password checklist, recomputed on every change and independent of
/// schema validation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PasswordRequirements {
    pub min_length: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
}

impl PasswordRequirements {
    pub fn check(password: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_PASSWORD_CHARS,
            has_uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
            has_lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
        }
    }

    #[cfg(test)]
    pub fn all_met(&self) -> bool {
        self.min_length && self.has_uppercase && self.has_lowercase && self.has_digit
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldView {
    pub id: String,
    pub name: Field,
    pub label: &'static str,
    pub input: InputKind,
    /// Current value. Secret fields never echo their contents.
    pub value: serde_json::Value,
    pub required: bool,
    pub optional: bool,
    pub disabled: bool,
    pub aria_invalid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_describedby: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    pub visibility_toggle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<PasswordRequirements>,
}

struct FieldSpec {
    label: &'static str,
    input: InputKind,
    required: bool,
    helper_text: Option<&'static str>,
    options: &'static [SelectOption],
}

const ROLE_OPTIONS: &[SelectOption] = &[
    SelectOption {
        value: "jobseeker",
        label: "I'm looking for a job",
    },
    SelectOption {
        value: "employer",
        label: "I'm hiring",
    },
];

const INDUSTRY_OPTIONS: &[SelectOption] = &[
    SelectOption {
        value: "technology",
        label: "Technology",
    },
    SelectOption {
        value: "finance",
        label: "Finance",
    },
    SelectOption {
        value: "healthcare",
        label: "Healthcare",
    },
    SelectOption {
        value: "education",
        label: "Education",
    },
    SelectOption {
        value: "retail",
        label: "Retail",
    },
    SelectOption {
        value: "manufacturing",
        label: "Manufacturing",
    },
    SelectOption {
        value: "other",
        label: "Other",
    },
];

const EXPERIENCE_OPTIONS: &[SelectOption] = &[
    SelectOption {
        value: "0-1",
        label: "Less than 1 year",
    },
    SelectOption {
        value: "1-3",
        label: "1-3 years",
    },
    SelectOption {
        value: "3-5",
        label: "3-5 years",
    },
    SelectOption {
        value: "5-10",
        label: "5-10 years",
    },
    SelectOption {
        value: "10+",
        label: "10+ years",
    },
];

fn spec_for(field: Field) -> FieldSpec {
    let plain = |label, input, required| FieldSpec {
        label,
        input,
        required,
        helper_text: None,
        options: &[],
    };
    match field {
        Field::Role => FieldSpec {
            options: ROLE_OPTIONS,
            ..plain("Account type", InputKind::RoleCards, true)
        },
        Field::FullName => plain("Full name", InputKind::Text, true),
        Field::Email => FieldSpec {
            helper_text: Some("We'll send a verification link to this address"),
            ..plain("Email address", InputKind::Email, true)
        },
        Field::Password => FieldSpec {
            helper_text: Some(
                "At least 8 characters with an uppercase letter, a lowercase letter and a number",
            ),
            ..plain("Password", InputKind::Password, true)
        },
        Field::ConfirmPassword => plain("Confirm password", InputKind::Password, true),
        Field::PhoneNumber => plain("Phone number", InputKind::Tel, false),
        Field::City => plain("City", InputKind::Text, false),
        Field::Country => plain("Country", InputKind::Text, false),
        Field::JobTitle => plain("Job title", InputKind::Text, false),
        Field::Industry => FieldSpec {
            options: INDUSTRY_OPTIONS,
            ..plain("Industry", InputKind::Select, false)
        },
        Field::YearsOfExperience => FieldSpec {
            options: EXPERIENCE_OPTIONS,
            ..plain("Years of experience", InputKind::Select, false)
        },
        Field::ResumeFile => FieldSpec {
            helper_text: Some("PDF, DOC or DOCX, up to 5 MB"),
            ..plain("Resume", InputKind::File, false)
        },
    }
}

pub fn field_id(field: Field) -> String {
    format!("signup-{}", field.as_str().replace('_', "-"))
}

fn current_value(field: Field, data: &SignupFormData) -> serde_json::Value {
    if field.is_secret() {
        return serde_json::Value::Null;
    }
    match field {
        Field::Role => serde_json::json!(data.role),
        Field::ResumeFile => serde_json::json!(data.resume_file),
        other => serde_json::json!(data.text(other).unwrap_or_default()),
    }
}

/// Builds the view of a single field.
pub fn field_view(
    field: Field,
    data: &SignupFormData,
    error: Option<&str>,
    disabled: bool,
) -> FieldView {
    let spec = spec_for(field);
    let id = field_id(field);

    let helper_id = spec.helper_text.map(|_| format!("{id}-helper"));
    let error_id = error.map(|_| format!("{id}-error"));
    let described: Vec<String> = helper_id.into_iter().chain(error_id).collect();

    let requirements = match field {
        Field::Password => Some(PasswordRequirements::check(&data.password)),
        _ => None,
    };

    FieldView {
        id,
        name: field,
        label: spec.label,
        input: spec.input,
        value: current_value(field, data),
        required: spec.required,
        optional: !spec.required,
        disabled,
        aria_invalid: error.is_some(),
        aria_describedby: (!described.is_empty()).then(|| described.join(" ")),
        helper_text: spec.helper_text,
        error: error.map(str::to_string),
        options: spec.options.to_vec(),
        visibility_toggle: spec.input == InputKind::Password,
        requirements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signup::Role;
    use crate::signup::steps::STEPS;

    #[test]
    fn test_requirements_checklist() {
        let r = PasswordRequirements::check("");
        assert!(!r.min_length && !r.has_uppercase && !r.has_lowercase && !r.has_digit);

        let r = PasswordRequirements::check("password1");
        assert!(r.min_length && !r.has_uppercase && r.has_lowercase && r.has_digit);
        assert!(!r.all_met());

        assert!(PasswordRequirements::check("Password1").all_met());
        assert!(!PasswordRequirements::check("Äbcdefg1").has_uppercase);
        assert!(!PasswordRequirements::check("ABCDEFä1").has_lowercase);
    }

    #[test]
    fn test_ids_are_stable_and_kebab_cased() {
        assert_eq!(field_id(Field::ConfirmPassword), "signup-confirm-password");
        assert_eq!(field_id(Field::Role), "signup-role");
    }

    #[test]
    fn test_error_sets_aria_attributes() {
        let data = SignupFormData::default();
        let view = field_view(Field::Email, &data, Some("Email is required"), false);
        assert!(view.aria_invalid);
        assert_eq!(
            view.aria_describedby.as_deref(),
            Some("signup-email-helper signup-email-error")
        );
        assert_eq!(view.error.as_deref(), Some("Email is required"));

        let view = field_view(Field::FullName, &data, None, false);
        assert!(!view.aria_invalid);
        assert!(view.aria_describedby.is_none());
    }

    #[test]
    fn test_password_never_echoed_and_has_checklist() {
        let data = SignupFormData {
            password: "Secret12".to_string(),
            ..Default::default()
        };
        let view = field_view(Field::Password, &data, None, true);
        assert_eq!(view.value, serde_json::Value::Null);
        assert!(view.visibility_toggle);
        assert!(view.disabled);
        assert!(view.requirements.unwrap().all_met());

        let confirm = field_view(Field::ConfirmPassword, &data, None, false);
        assert!(confirm.visibility_toggle);
        assert!(confirm.requirements.is_none());
    }

    #[test]
    fn test_contact_fields_render_as_optional() {
        for field in STEPS[2].fields {
            let view = field_view(*field, &SignupFormData::default(), None, false);
            assert!(view.optional, "{} should be optional", field.as_str());
            assert!(!view.required);
        }
    }

    #[test]
    fn test_role_value_serializes_as_wire_string() {
        let data = SignupFormData {
            role: Some(Role::JobSeeker),
            ..Default::default()
        };
        let view = field_view(Field::Role, &data, None, false);
        assert_eq!(view.value, serde_json::json!("jobseeker"));
        assert_eq!(view.options.len(), 2);
    }
}
