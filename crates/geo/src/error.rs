//! Error types for street-grid-geo
//!
//! ## Table of Contents
//! 1. GridError - Main error enum
//! 2. ErrorKind - Copyable discriminant
//! 3. Result type alias

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for street-grid operations
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors that can occur anywhere in the extraction pipeline.
///
/// Every failure is fatal to the current run; nothing is retried.
#[derive(Error, Debug)]
pub enum GridError {
    /// Invalid user-supplied parameter (radius, address, geometry)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Dataset missing, unreadable, or incomplete
    #[error("Dataset error at {}: {}", .path.display(), .reason)]
    Data { path: PathBuf, reason: String },

    /// Geocoding provider unreachable or returned an unusable answer
    #[error("Geocoding service error: {0}")]
    ExternalService(String),

    /// An output artifact could not be produced
    #[error("Render error: {0}")]
    Render(String),
}

/// Discriminant of [`GridError`], for callers that branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Data,
    ExternalService,
    Render,
}

impl GridError {
    pub fn validation(message: impl Into<String>) -> Self {
        GridError::Validation(message.into())
    }

    pub fn data(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        GridError::Data {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        GridError::Render(message.into())
    }

    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridError::Validation(_) => ErrorKind::Validation,
            GridError::Data { .. } => ErrorKind::Data,
            GridError::ExternalService(_) => ErrorKind::ExternalService,
            GridError::Render(_) => ErrorKind::Render,
        }
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Render(format!("JSON serialization failed: {}", err))
    }
}
