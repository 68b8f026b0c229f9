//! Error types.
//!
//! Configuration and lookup errors surface at construction time, before any
//! simulated step runs. Numerical degeneracies inside a run are clamped where
//! they occur and never reach these types.

use crate::systems::ambient::Timestamp;

/// Errors arising from configuration parsing, validation, or I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing failed.
    #[error("Parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: toml::de::Error,
    },

    /// File I/O error.
    #[error("IO error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A single field holds an out-of-range value.
    #[error("Field '{field}' has invalid value {value}: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// One or more validation rules failed; the message lists all of them.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: impl std::fmt::Display, reason: &'static str) -> Self {
        ConfigError::InvalidField { field, value: value.to_string(), reason }
    }
}

/// Errors from the external hourly ambient table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("no ambient sample recorded at {0}")]
    MissingTimestamp(Timestamp),

    #[error("ambient range ends at {end} before it starts at {start}")]
    ReversedRange { start: Timestamp, end: Timestamp },

    #[error("ambient table could not supply the rows from {start} to {end}")]
    RowsUnavailable { start: Timestamp, end: Timestamp },
}

#[derive(Debug, thiserror::Error)]
pub enum ThermoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("ambient lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// Ambient profile queried outside `[0, duration]` hours.
    #[error("ambient time {t} h is outside [0, {duration}] h")]
    OutOfRange { t: f64, duration: f64 },
}

pub type Result<T> = std::result::Result<T, ThermoError>;
