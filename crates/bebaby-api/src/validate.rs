use std::sync::LazyLock;

use regex::Regex;

use crate::error::ApiError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,32}$").expect("username pattern is valid"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed value, or a 400 naming the field.
pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(value)
}

pub fn max_len<'a>(field: &str, value: &'a str, max: usize) -> Result<&'a str, ApiError> {
    let value = required(field, value)?;
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}

/// Lowercased, since addresses are unique case-insensitively.
pub fn email(value: &str) -> Result<String, ApiError> {
    let value = required("email", value)?;
    if !EMAIL.is_match(value) {
        return Err(ApiError::validation("email is invalid"));
    }
    Ok(value.to_lowercase())
}

pub fn username(value: &str) -> Result<&str, ApiError> {
    let value = required("username", value)?;
    if !USERNAME.is_match(value) {
        return Err(ApiError::validation(
            "username must be 3-32 letters, digits or underscores",
        ));
    }
    Ok(value)
}

pub fn password(value: &str) -> Result<&str, ApiError> {
    if value.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(value)
}
