//! Draft validation errors shared by event and contact models.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised before a draft is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty after trimming.
    EmptyField(&'static str),
    /// Phone input does not normalize to a dialable number.
    InvalidPhone(String),
    /// Configured country prefix is not `+` followed by 1-3 digits.
    InvalidCountryCode(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::InvalidPhone(value) => write!(
                f,
                "invalid phone `{value}`; expected a 10-digit number or +<country><number>"
            ),
            Self::InvalidCountryCode(value) => {
                write!(f, "invalid country code `{value}`; expected + and 1-3 digits")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}
