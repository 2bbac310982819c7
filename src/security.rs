//! Input hygiene rules shared by the request forms.
//!
//! Each function has the signature `validator` expects for `#[validate(custom = "...")]`.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    pub static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
    pub static ref CONTACT_NUMBER_REGEX: Regex = Regex::new(r"^\+?1?\d{9,15}$").unwrap();
    static ref HTML_TAG_REGEX: Regex = Regex::new(r"<\s*/?\s*[a-zA-Z!][^>]*>").unwrap();
}

const PASSWORD_SYMBOLS: &str = "@$!%*?&";

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects text that contains HTML tags or script markup.
pub fn no_html(value: &str) -> Result<(), ValidationError> {
    if HTML_TAG_REGEX.is_match(value) {
        return Err(error(
            "html",
            "Input must not contain HTML tags or scripts",
        ));
    }
    Ok(())
}

/// Passwords need 8+ characters with upper, lower, digit and one of `@$!%*?&`.
pub fn password_strength(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < 8 {
        return Err(error(
            "password_length",
            "Password must be at least 8 characters long",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(error(
            "password_uppercase",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(error(
            "password_lowercase",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(error(
            "password_digit",
            "Password must contain at least one digit",
        ));
    }
    if !value.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(error(
            "password_symbol",
            "Password must contain at least one special symbol (@, $, !, %, *, ?, &)",
        ));
    }
    Ok(())
}

pub fn alphabetic_name(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || !value.chars().all(char::is_alphabetic) {
        return Err(error(
            "name",
            "Name must only contain alphabetic characters",
        ));
    }
    Ok(())
}
