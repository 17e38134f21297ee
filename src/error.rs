//! Error surface of the enrichment stage.
//!
//! Two failure categories exist (and nothing else): configuration issues
//! reported as a list at start-up, and per-record errors raised at run time.
//! Per-record errors own the offending record so the caller's error policy
//! can still route it somewhere.

use std::fmt;

use thiserror::Error;

use crate::record::{FieldKind, Record};

/// Stage-defined error codes with a stable string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The configuration value was rejected at start-up.
    InvalidConfig,
    /// The record's file reference could not produce a byte stream.
    StreamUnavailable,
    /// Metadata could not be extracted from the byte stream.
    MetadataRead,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "ENRICH_00",
            ErrorCode::StreamUnavailable => "ENRICH_01",
            ErrorCode::MetadataRead => "ENRICH_02",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "configuration value is not valid",
            ErrorCode::StreamUnavailable => "record file stream could not be opened",
            ErrorCode::MetadataRead => "failed to extract metadata from the record's file",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A start-up-time configuration validation failure.
///
/// `initialize` returns a (possibly empty) list of these; the caller must
/// refuse to start the stage when the list is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Configuration group the offending option belongs to.
    pub group: String,
    /// Name of the offending option.
    pub option: String,
    pub code: ErrorCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(
        group: impl Into<String>,
        option: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self { group: group.into(), option: option.into(), code, message: message.into() }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}: {}", self.group, self.option, self.code, self.message)
    }
}

/// A per-record failure: error code, the offending record, and the cause.
///
/// Raised when stream acquisition or metadata parsing fails. The record was
/// not forwarded on the output lane; the caller's error policy decides what
/// happens to it next.
#[derive(Debug, Error)]
#[error("{code}: {} (record {})", .code.default_message(), .record.id())]
pub struct OnRecordError {
    pub code: ErrorCode,
    pub record: Record,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl OnRecordError {
    pub fn new(
        code: ErrorCode,
        record: Record,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self { code, record, source: source.into() }
    }

    /// Give the offending record back, dropping the error envelope.
    pub fn into_record(self) -> Record {
        self.record
    }
}

/// An explicit record-path lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldPathError {
    #[error("invalid field path {path:?}: paths are absolute and /-separated")]
    Invalid { path: String },

    #[error("no field at {path}")]
    Missing { path: String },

    #[error("field at {path} is a {actual}, expected a {expected}")]
    WrongKind { path: String, expected: FieldKind, actual: FieldKind },
}

/// Start-up refused: `initialize` reported configuration issues.
#[derive(Debug, Error)]
#[error("stage start-up rejected with {} configuration issue(s)", .issues.len())]
pub struct StartupError {
    pub issues: Vec<ConfigIssue>,
}
