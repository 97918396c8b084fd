//! Input validation utilities

use std::sync::LazyLock;

use regex::Regex;
use validator::ValidateEmail;

use crate::constants::MAX_USERNAME_LENGTH;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Validate username format
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.chars().count() as u64 > MAX_USERNAME_LENGTH {
        return Err("Ensure this field has no more than 150 characters.");
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.to_owned().validate_email() {
        Ok(())
    } else {
        Err("Enter a valid email address.")
    }
}
