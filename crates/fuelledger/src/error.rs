//! Error types for fuelledger.
//!
//! This module defines all error types used throughout the fuelledger crate.
//! The metric and filter functions never produce errors; everything here
//! belongs to the collaborators around them (storage, configuration,
//! authentication and submission).

use std::path::PathBuf;
use thiserror::Error;

use crate::submission::FieldError;

/// The main error type for fuelledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A uniqueness rule was violated (duplicate plate, username, ...).
    #[error("{message}")]
    Conflict {
        /// Description of the conflicting value.
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Authentication Errors ===
    /// Username or password did not match.
    #[error("incorrect username or password")]
    InvalidCredentials,

    /// No valid session is available.
    #[error("not logged in; run `fuelctl login <username>` first")]
    NotAuthenticated,

    /// The actor's role does not allow the operation.
    #[error("permission denied: {action} requires {required}")]
    PermissionDenied {
        /// What was attempted.
        action: String,
        /// What was missing.
        required: String,
    },

    /// Password hashing or verification failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    // === Submission Errors ===
    /// A submitted entity failed validation.
    #[error("invalid {subject}: {}", join_field_errors(.errors))]
    InvalidSubmission {
        /// What was being submitted.
        subject: &'static str,
        /// Every failing field.
        errors: Vec<FieldError>,
    },

    /// A single input value could not be accepted.
    #[error("invalid value for {field}: {message}")]
    InvalidInput {
        /// Name of the offending input.
        field: &'static str,
        /// Why it was rejected.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fuelledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a not-found error for the given entity kind.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a permission error.
    #[must_use]
    pub fn permission_denied(action: impl Into<String>, required: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
            required: required.into(),
        }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Check if this error is an authentication or authorization failure.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::NotAuthenticated | Self::PermissionDenied { .. }
        )
    }

    /// Check if this error carries field-level validation failures.
    #[must_use]
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::InvalidSubmission { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
