//! Per-step validation schemas.
//!
//! Each schema checks only the fields its step owns and reports every issue
//! in order. Cross-field rules (password confirmation) run as a refinement
//! after the per-field rules so the issue always lands on `confirm_password`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::signup::{Field, SignupFormData};

pub const MIN_FULL_NAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: Field,
    pub message: String,
}

/// Ordered list of issues produced by a failing schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn first_message(&self) -> &str {
        self.issues
            .first()
            .map(|i| i.message.as_str())
            .unwrap_or("Validation failed")
    }

    /// Error map keyed by field; the first issue per field wins.
    pub fn into_field_map(self) -> BTreeMap<Field, String> {
        let mut map = BTreeMap::new();
        for issue in self.issues {
            map.entry(issue.field).or_insert(issue.message);
        }
        map
    }

    #[cfg(test)]
    pub fn messages_for(&self, field: Field) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(move |i| i.field == field)
            .map(|i| i.message.as_str())
    }
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            field,
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { issues: self.0 })
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Runs the schema for `step` against the form data.
/// Steps without fields (and unknown steps) always pass.
pub fn validate_step(step: u8, data: &SignupFormData) -> Result<(), ValidationErrors> {
    match step {
        1 => validate_account_type(data),
        2 => validate_create_account(data),
        3 => validate_contact_info(data),
        4 => validate_work_background(data),
        5 => validate_resume_upload(data),
        _ => Ok(()),
    }
}

pub fn validate_account_type(data: &SignupFormData) -> Result<(), ValidationErrors> {
    let mut issues = Issues::default();
    if data.role.is_none() {
        issues.push(Field::Role, "Please select an account type");
    }
    issues.finish()
}

pub fn validate_create_account(data: &SignupFormData) -> Result<(), ValidationErrors> {
    let mut issues = Issues::default();

    let full_name = data.full_name.trim();
    if full_name.is_empty() {
        issues.push(Field::FullName, "Full name is required");
    } else if full_name.chars().count() < MIN_FULL_NAME_CHARS {
        issues.push(
            Field::FullName,
            format!("Full name must be at least {MIN_FULL_NAME_CHARS} characters"),
        );
    }

    let email = data.email.trim();
    if email.is_empty() {
        issues.push(Field::Email, "Email is required");
    } else if !is_valid_email(email) {
        issues.push(Field::Email, "Please enter a valid email address");
    }

    let password = &data.password;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        issues.push(
            Field::Password,
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
        );
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        issues.push(
            Field::Password,
            "Password must contain at least one uppercase letter",
        );
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        issues.push(
            Field::Password,
            "Password must contain at least one lowercase letter",
        );
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(Field::Password, "Password must contain at least one number");
    }

    // Refinement: confirmation must match.
    if data.confirm_password != data.password {
        issues.push(Field::ConfirmPassword, "Passwords do not match");
    }

    issues.finish()
}

/// Contact details are optional; city and country are rendered as optional too.
pub fn validate_contact_info(_data: &SignupFormData) -> Result<(), ValidationErrors> {
    Ok(())
}

pub fn validate_work_background(_data: &SignupFormData) -> Result<(), ValidationErrors> {
    Ok(())
}

pub fn validate_resume_upload(data: &SignupFormData) -> Result<(), ValidationErrors> {
    let mut issues = Issues::default();
    if let Some(file) = &data.resume_file {
        if !file.is_file_like() {
            issues.push(Field::ResumeFile, "Please select a valid resume file");
        }
    }
    issues.finish()
}
