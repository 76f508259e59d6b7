#![allow(dead_code)]

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "jobseeker")]
    JobSeeker,
    Employer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "jobseeker",
            Role::Employer => "employer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jobseeker" => Some(Role::JobSeeker),
            "employer" => Some(Role::Employer),
            _ => None,
        }
    }
}

/// Reference to an uploaded resume. The bytes live in the session store,
/// never inside the serialized form data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl ResumeFile {
    pub fn is_file_like(&self) -> bool {
        !self.file_name.trim().is_empty()
    }
}

/// Every input collected by the signup wizard.
///
/// All fields are always present, so any step can read any field regardless
/// of how the user navigated. Unset text fields are empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SignupFormData {
    #[serde(deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "confirmPassword")]
    pub confirm_password: String,
    pub phone_number: String,
    pub city: String,
    pub country: String,
    pub job_title: String,
    pub industry: String,
    pub years_of_experience: String,
    #[serde(alias = "resumeFile")]
    pub resume_file: Option<ResumeFile>,
}

/// Unknown role strings collapse to "no role" so step 1 reports them as unselected.
fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(Role::parse))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Role,
    FullName,
    Email,
    Password,
    #[serde(alias = "confirmPassword")]
    ConfirmPassword,
    PhoneNumber,
    City,
    Country,
    JobTitle,
    Industry,
    YearsOfExperience,
    #[serde(alias = "resumeFile")]
    ResumeFile,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Role,
        Field::FullName,
        Field::Email,
        Field::Password,
        Field::ConfirmPassword,
        Field::PhoneNumber,
        Field::City,
        Field::Country,
        Field::JobTitle,
        Field::Industry,
        Field::YearsOfExperience,
        Field::ResumeFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Role => "role",
            Field::FullName => "full_name",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm_password",
            Field::PhoneNumber => "phone_number",
            Field::City => "city",
            Field::Country => "country",
            Field::JobTitle => "job_title",
            Field::Industry => "industry",
            Field::YearsOfExperience => "years_of_experience",
            Field::ResumeFile => "resume_file",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Field::Password | Field::ConfirmPassword)
    }
}

/// A typed value ready to be written into [`SignupFormData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Role(Option<Role>),
    Resume(Option<ResumeFile>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("{field} expects a text value")]
    ExpectedText { field: &'static str },

    #[error("role expects \"jobseeker\", \"employer\" or null")]
    ExpectedRole,

    #[error("resume_file can only be cleared here; upload files through the resume endpoint")]
    ResumeUploadRequired,

    #[error("{field} does not match the field value kind")]
    KindMismatch { field: &'static str },
}

impl FieldValue {
    /// Converts a raw JSON value into the type the field stores.
    ///
    /// Any string is accepted for `role`; strings other than the two known
    /// roles become "no role" and fail step-1 validation later.
    pub fn from_json(field: Field, value: Value) -> Result<Self, FieldError> {
        match field {
            Field::Role => match value {
                Value::Null => Ok(FieldValue::Role(None)),
                Value::String(s) => Ok(FieldValue::Role(Role::parse(&s))),
                _ => Err(FieldError::ExpectedRole),
            },
            Field::ResumeFile => match value {
                Value::Null => Ok(FieldValue::Resume(None)),
                _ => Err(FieldError::ResumeUploadRequired),
            },
            _ => match value {
                Value::String(s) => Ok(FieldValue::Text(s)),
                Value::Null => Ok(FieldValue::Text(String::new())),
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                _ => Err(FieldError::ExpectedText {
                    field: field.as_str(),
                }),
            },
        }
    }
}

impl SignupFormData {
    pub fn text(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::FullName => &self.full_name,
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::ConfirmPassword => &self.confirm_password,
            Field::PhoneNumber => &self.phone_number,
            Field::City => &self.city,
            Field::Country => &self.country,
            Field::JobTitle => &self.job_title,
            Field::Industry => &self.industry,
            Field::YearsOfExperience => &self.years_of_experience,
            Field::Role | Field::ResumeFile => return None,
        };
        Some(value.as_str())
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        let value = match field {
            Field::FullName => &mut self.full_name,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
            Field::ConfirmPassword => &mut self.confirm_password,
            Field::PhoneNumber => &mut self.phone_number,
            Field::City => &mut self.city,
            Field::Country => &mut self.country,
            Field::JobTitle => &mut self.job_title,
            Field::Industry => &mut self.industry,
            Field::YearsOfExperience => &mut self.years_of_experience,
            Field::Role | Field::ResumeFile => return None,
        };
        Some(value)
    }

    /// Writes `value` into `field`, leaving every other field untouched.
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<(), FieldError> {
        match (field, value) {
            (Field::Role, FieldValue::Role(role)) => self.role = role,
            (Field::ResumeFile, FieldValue::Resume(file)) => self.resume_file = file,
            (field, FieldValue::Text(text)) => {
                let slot = self.text_mut(field).ok_or(FieldError::KindMismatch {
                    field: field.as_str(),
                })?;
                *slot = text;
            }
            (field, _) => {
                return Err(FieldError::KindMismatch {
                    field: field.as_str(),
                })
            }
        }
        Ok(())
    }

    /// Copy suitable for the welcome screen: passwords blanked.
    pub fn without_secrets(&self) -> Self {
        Self {
            password: String::new(),
            confirm_password: String::new(),
            ..self.clone()
        }
    }
}
