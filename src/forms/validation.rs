//! Field validators shared by the console forms and the resource services.
//!
//! Each validator returns `Err(message)` with the text shown next to the
//! offending field. Collect them with `ValidationErrorBuilder::check`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Deliberately loose: one `@`, no whitespace, a dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MIN_NAME_LENGTH: usize = 2;
const MAX_TEXT_LENGTH: usize = 256;
const MAX_DESCRIPTION_LENGTH: usize = 2000;

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

/// Validate a password (length only; the identity provider owns the policy)
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// Validate a name-like field with a minimum length of two characters
pub fn validate_name(value: &str, what: &str) -> Result<(), String> {
    let len = char_len(value);
    if len < MIN_NAME_LENGTH {
        return Err(format!(
            "{} must be at least {} characters",
            what, MIN_NAME_LENGTH
        ));
    }
    if len > MAX_TEXT_LENGTH {
        return Err(format!(
            "{} is too long (max {} characters)",
            what, MAX_TEXT_LENGTH
        ));
    }
    Ok(())
}

/// Validate an optional free-text description
pub fn validate_description(description: &Option<String>) -> Result<(), String> {
    if let Some(d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(format!(
                "Description is too long (max {} characters)",
                MAX_DESCRIPTION_LENGTH
            ));
        }
    }
    Ok(())
}

/// Validate a required identifier picked from a list
pub fn validate_required(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(message.to_string());
    }
    Ok(())
}

/// Validate an upload title
pub fn validate_title(title: &str) -> Result<(), String> {
    if char_len(title) < MIN_NAME_LENGTH {
        return Err("Title is required".to_string());
    }
    if char_len(title) > MAX_TEXT_LENGTH {
        return Err(format!("Title is too long (max {} characters)", MAX_TEXT_LENGTH));
    }
    Ok(())
}

/// Normalise an optional text input: blank becomes `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
