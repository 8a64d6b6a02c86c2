//! Contact domain model.
//!
//! # Responsibility
//! - Define the contact record owned by the contact directory.
//! - Normalize phone input into a dialable `+<country><number>` form.
//!
//! # Invariants
//! - Persisted phones always start with `+` followed by 8-15 digits.

use crate::model::validation::{require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque contact identifier assigned by the contact directory.
pub type ContactId = Uuid;

/// Country prefix applied to bare national numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

const NATIONAL_NUMBER_DIGITS: usize = 10;

static COUNTRY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[0-9]{1,3}$").expect("valid country code regex"));
static INTERNATIONAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[0-9]{8,15}$").expect("valid international phone regex"));
static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid digit regex"));

/// Contact as returned by the contact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
}

/// Input for creating a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub phone: String,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// Returns a copy with trimmed name and normalized phone.
    ///
    /// Bare input is stripped of separators and must contain exactly ten
    /// digits; `country_code` is then prepended. Input already starting with
    /// `+` is kept when it has 8-15 digits.
    ///
    /// # Errors
    /// - `EmptyField("name")` for a blank name.
    /// - `InvalidPhone` when the number cannot be normalized.
    /// - `InvalidCountryCode` when `country_code` is malformed.
    pub fn normalized(&self, country_code: &str) -> Result<Self, ValidationError> {
        let name = require_text("name", &self.name)?;
        let phone = normalize_phone(&self.phone, country_code)?;
        Ok(Self { name, phone })
    }
}

/// Checks a configured country prefix such as `+91`.
pub fn validate_country_code(country_code: &str) -> Result<(), ValidationError> {
    if COUNTRY_CODE_RE.is_match(country_code) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCountryCode(country_code.to_string()))
    }
}

fn normalize_phone(raw: &str, country_code: &str) -> Result<String, ValidationError> {
    validate_country_code(country_code)?;

    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('+') {
        let candidate = format!("+{}", NON_DIGIT_RE.replace_all(rest, ""));
        if INTERNATIONAL_RE.is_match(&candidate) {
            return Ok(candidate);
        }
        return Err(ValidationError::InvalidPhone(trimmed.to_string()));
    }

    let digits = NON_DIGIT_RE.replace_all(trimmed, "");
    if digits.len() != NATIONAL_NUMBER_DIGITS {
        return Err(ValidationError::InvalidPhone(trimmed.to_string()));
    }
    Ok(format!("{country_code}{digits}"))
}
