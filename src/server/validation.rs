//! Request validation utilities for the StaffHelp API.

use std::fmt;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Require a field to be present and not empty or whitespace only.
///
/// Returns the borrowed value on success, so handlers can keep working with
/// the validated string.
pub fn require_non_empty<'a>(value: Option<&'a str>, field_name: &str) -> ValidationResult<&'a str> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError {
            field: field_name.to_string(),
            message: "must be present and non-empty".to_string(),
        }),
    }
}

/// Validate a license key shape: dash-separated 5-character groups of
/// uppercase letters and digits.
///
/// # Example
/// ```
/// use staffhelp::server::validation::validate_license_key;
///
/// assert!(validate_license_key("AB3F9-12KXZ-99PPQ", "key").is_ok());
/// assert!(validate_license_key("not-a-key", "key").is_err());
/// ```
pub fn validate_license_key(value: &str, field_name: &str) -> ValidationResult<()> {
    let key_regex = regex::Regex::new(r"^[A-Z0-9]{5}(-[A-Z0-9]{5}){2}$").unwrap();

    if key_regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "invalid license key format (expected: XXXXX-XXXXX-XXXXX)".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_non_empty_accepts_values() {
        assert_eq!(require_non_empty(Some("HW-001"), "hwid").unwrap(), "HW-001");
    }

    #[test]
    fn require_non_empty_rejects_missing() {
        assert!(require_non_empty(None, "key").is_err());
    }

    #[test]
    fn require_non_empty_rejects_blank() {
        assert!(require_non_empty(Some(""), "key").is_err());
        assert!(require_non_empty(Some("   "), "key").is_err());
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = require_non_empty(None, "hwid").unwrap_err();
        assert_eq!(err.field, "hwid");
        assert!(err.to_string().starts_with("hwid:"));
    }

    #[test]
    fn validate_license_key_accepts_expected_shape() {
        assert!(validate_license_key("AB3F9-12KXZ-99PPQ", "key").is_ok());
    }

    #[test]
    fn validate_license_key_rejects_malformed() {
        assert!(validate_license_key("", "key").is_err());
        assert!(validate_license_key("ab3f9-12kxz-99ppq", "key").is_err());
        assert!(validate_license_key("AB3F9-12KXZ", "key").is_err());
        assert!(validate_license_key("AB3F9-12KXZ-99PPQ-EXTRA", "key").is_err());
    }
}
