//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use std::sync::LazyLock;

use validator::Validate;

use crate::error::SoukError;

/// Nigerian-style phone numbers: local `0XXXXXXXXXX` or international `+234XXXXXXXXXX`.
pub static PHONE_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(\+234|0)[789][01]\d{8}$").unwrap());

/// Validate a request body, returning a SoukError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), SoukError> {
    body.validate().map_err(|e| SoukError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    let mut messages = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}

/// Reject blank names (markets, products, lists, categories).
pub fn validate_name(name: &str) -> Result<(), SoukError> {
    if name.trim().is_empty() {
        return Err(SoukError::Validation {
            message: "Name cannot be empty or whitespace only".into(),
        });
    }
    Ok(())
}

/// Money amounts are kobo and must not be negative.
pub fn validate_amount(field: &str, amount: i64) -> Result<(), SoukError> {
    if amount < 0 {
        return Err(SoukError::Validation {
            message: format!("{field} cannot be negative"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers() {
        assert!(PHONE_REGEX.is_match("08031234567"));
        assert!(PHONE_REGEX.is_match("+2349031234567"));
        assert!(!PHONE_REGEX.is_match("12345"));
        assert!(!PHONE_REGEX.is_match("0603123456"));
    }

    #[test]
    fn blank_names_rejected() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("Balogun Market").is_ok());
    }

    #[test]
    fn negative_amounts_rejected() {
        assert!(validate_amount("price", -1).is_err());
        assert!(validate_amount("price", 0).is_ok());
    }
}
