//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe the knobs hosts may set: storage path, logging, phone prefix
//!   and reconciler retries.
//! - Validate a deserialized config before anything is opened.
//!
//! # Invariants
//! - Every field has a default, so an empty document is a valid config.

use crate::logging::{default_log_level, normalize_level};
use crate::model::contact::{validate_country_code, DEFAULT_COUNTRY_CODE};
use crate::model::validation::ValidationError;
use crate::selection::reconciler::{ReconcilerOptions, DEFAULT_BULK_RETRY_LIMIT};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const MAX_BULK_RETRY_LIMIT: u32 = 5;

/// Configuration consumed by hosts embedding the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
    /// Prefix applied to bare 10-digit phone numbers.
    pub country_code: String,
    pub bulk_retry_limit: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            bulk_retry_limit: DEFAULT_BULK_RETRY_LIMIT,
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    LogLevel(String),
    LogDir(PathBuf),
    CountryCode(ValidationError),
    BulkRetryLimit(u32),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogLevel(message) => write!(f, "{message}"),
            Self::LogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::CountryCode(err) => write!(f, "{err}"),
            Self::BulkRetryLimit(value) => write!(
                f,
                "bulk_retry_limit {value} exceeds maximum {MAX_BULK_RETRY_LIMIT}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CountryCode(err) => Some(err),
            _ => None,
        }
    }
}

impl CoreConfig {
    /// Checks every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::LogLevel)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::LogDir(dir.clone()));
            }
        }
        validate_country_code(&self.country_code).map_err(ConfigError::CountryCode)?;
        if self.bulk_retry_limit > MAX_BULK_RETRY_LIMIT {
            return Err(ConfigError::BulkRetryLimit(self.bulk_retry_limit));
        }
        Ok(())
    }

    pub fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            bulk_retry_limit: self.bulk_retry_limit,
        }
    }
}
