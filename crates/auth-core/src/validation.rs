//! Input validation helpers for the auth DTOs

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap());

/// Usernames are limited to a conservative character set; length bounds are
/// enforced separately by the derive attributes.
pub fn validate_username_format(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username_format"))
    }
}
