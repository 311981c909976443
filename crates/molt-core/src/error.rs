//! Error types and exit code constants for molt.
//!
//! This module provides a unified error type (`MoltError`) that bridges
//! errors from the different pipeline stages (configuration, loading,
//! transforming, packaging) into a common format suitable for reporting
//! and for deriving the process exit status.
//!
//! ## Exit Code Mapping
//!
//! - `2`: Configuration errors (bad config file, unknown component)
//! - `3`: Load errors (missing entry point, unparsable source)
//! - `4`: Transform errors (a transformer failed on an asset)
//! - `5`: Packaging errors (output could not be written)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::io;

use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Stable exit codes derived from the error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Configuration errors (bad input from the caller).
    ConfigError = 2,
    /// Load errors (discovery or parse failures).
    LoadError = 3,
    /// Transform errors (a pass failed on an asset).
    TransformError = 4,
    /// Packaging errors (output could not be written).
    PackageError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl ExitStatus {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the pipeline.
///
/// Each variant carries enough context to report the failure with the
/// asset and component that produced it.
#[derive(Debug, Error)]
pub enum MoltError {
    /// Configuration could not be read or validated.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// An unknown component name was referenced by the configuration.
    #[error("unknown {kind} {name:?}")]
    UnknownComponent { kind: &'static str, name: String },

    /// A bundle failed to load.
    #[error("load error: {message}")]
    Load { message: String },

    /// A module failed to parse.
    #[error("failed to parse module {module}: {message}")]
    Parse { module: String, message: String },

    /// A transformer failed on an asset.
    #[error("transformer {transformer:?} failed on module {module}: {message}")]
    Transform {
        module: String,
        transformer: String,
        message: String,
    },

    /// Output could not be written.
    #[error("packaging error: {message}")]
    Package { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result alias used across the pipeline.
pub type MoltResult<T> = Result<T, MoltError>;

// ============================================================================
// Exit Status Mapping
// ============================================================================

impl From<&MoltError> for ExitStatus {
    fn from(err: &MoltError) -> Self {
        match err {
            MoltError::Config { .. } | MoltError::UnknownComponent { .. } => {
                ExitStatus::ConfigError
            }
            MoltError::Load { .. } | MoltError::Parse { .. } => ExitStatus::LoadError,
            MoltError::Transform { .. } => ExitStatus::TransformError,
            MoltError::Package { .. } => ExitStatus::PackageError,
            MoltError::Io(_) | MoltError::Json(_) | MoltError::Internal { .. } => {
                ExitStatus::InternalError
            }
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl MoltError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MoltError::Config {
            message: message.into(),
        }
    }

    /// Create a load error.
    pub fn load(message: impl Into<String>) -> Self {
        MoltError::Load {
            message: message.into(),
        }
    }

    /// Create a parse error for a module.
    pub fn parse(module: impl Into<String>, message: impl Into<String>) -> Self {
        MoltError::Parse {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create a transform error for a module/transformer pair.
    pub fn transform(
        module: impl Into<String>,
        transformer: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MoltError::Transform {
            module: module.into(),
            transformer: transformer.into(),
            message: message.into(),
        }
    }

    /// Create a packaging error.
    pub fn package(message: impl Into<String>) -> Self {
        MoltError::Package {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        MoltError::Internal {
            message: message.into(),
        }
    }

    /// Get the exit status for this error.
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
