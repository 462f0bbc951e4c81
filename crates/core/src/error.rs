//! Unified error types for navigation analytics.
//!
//! Error codes:
//! - CONF_001-004: Configuration errors
//! - SCHEMA_001: Event table schema errors
//! - SCOPE_001: Empty metric scope
//! - PERSIST_001-004: Snapshot persistence errors
//! - EXPORT_001: Spreadsheet export errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// CONF_001: Required field missing or empty
    MissingField,
    /// CONF_002: Unparseable column type descriptor
    InvalidType,
    /// CONF_003: Invalid date format pattern
    InvalidDateFormat,
    /// CONF_004: Configuration document could not be read
    Unreadable,
}

impl ConfigErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField => "CONF_001",
            Self::InvalidType => "CONF_002",
            Self::InvalidDateFormat => "CONF_003",
            Self::Unreadable => "CONF_004",
        }
    }
}

/// Persistence error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorCode {
    /// PERSIST_001: Snapshot file does not exist
    Missing,
    /// PERSIST_002: I/O failure reading or writing a snapshot
    Io,
    /// PERSIST_003: Snapshot is truncated or not a snapshot at all
    Corrupt,
    /// PERSIST_004: Snapshot written by an unknown format version
    IncompatibleVersion,
}

impl PersistenceErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing => "PERSIST_001",
            Self::Io => "PERSIST_002",
            Self::Corrupt => "PERSIST_003",
            Self::IncompatibleVersion => "PERSIST_004",
        }
    }
}

/// Unified error type for navigation analytics.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with code.
    #[error("[{code}] {message}")]
    Configuration {
        code: &'static str,
        message: String,
    },

    /// A metric was requested over zero sessions.
    #[error("[SCOPE_001] no sessions in scope for {metric} (group: {group})")]
    EmptyScope { metric: String, group: String },

    /// Persistence error with code.
    #[error("[{code}] {message}")]
    Persistence {
        code: &'static str,
        message: String,
    },

    #[error("[SCHEMA_001] schema error: {0}")]
    Schema(String),

    #[error("[EXPORT_001] export error: {0}")]
    Export(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(code: ConfigErrorCode, msg: impl Into<String>) -> Self {
        Self::Configuration {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a persistence error.
    pub fn persistence(code: PersistenceErrorCode, msg: impl Into<String>) -> Self {
        Self::Persistence {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn empty_scope(metric: impl ToString, group: impl ToString) -> Self {
        Self::EmptyScope {
            metric: metric.to_string(),
            group: group.to_string(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Configuration { code, .. } => Some(code),
            Self::Persistence { code, .. } => Some(code),
            Self::EmptyScope { .. } => Some("SCOPE_001"),
            Self::Schema(_) => Some("SCHEMA_001"),
            Self::Export(_) => Some("EXPORT_001"),
            Self::Internal(_) => None,
        }
    }

    pub fn is_empty_scope(&self) -> bool {
        matches!(self, Self::EmptyScope { .. })
    }
}
