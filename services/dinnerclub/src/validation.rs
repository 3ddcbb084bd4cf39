//! Input validation utilities

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 10;

/// Highest accepted rating value
pub const MAX_RATING: i64 = 5;

/// A validation failure tied to one input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collects field errors across several checks
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one field check
    pub fn check(mut self, field: &'static str, result: Result<(), String>) -> Self {
        if let Err(message) = result {
            self.errors.push(FieldError { field, message });
        }
        self
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters long".to_string());
    }

    if username.len() > 32 {
        return Err("Username must be at most 32 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters and numbers".to_string());
    }

    Ok(())
}

/// Validate an optional email; empty means "not provided"
pub fn validate_email(email: Option<&str>) -> Result<(), String> {
    let Some(email) = email else {
        return Ok(());
    };

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate an optional free-text field against the column width
pub fn validate_length(value: Option<&str>, label: &str) -> Result<(), String> {
    match value {
        Some(value) if value.len() > 255 => {
            Err(format!("{} must be at most 255 characters long", label))
        }
        _ => Ok(()),
    }
}

/// Validate a required text field
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required, but was empty.", label));
    }
    validate_length(Some(value), label)
}

/// Validate a rating
pub fn validate_rating(rating: i64, label: &str) -> Result<(), String> {
    if !(0..=MAX_RATING).contains(&rating) {
        return Err(format!("{} must be between 0 and {}", label, MAX_RATING));
    }
    Ok(())
}

/// Trim a form value, mapping blank input to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
