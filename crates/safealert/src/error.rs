//! Error types for safealert.
//!
//! This module defines all error types used throughout the safealert crate.
//! Every error ends up as a transient status message for the user; see
//! [`Error::user_message`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for safealert operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Location Errors ===
    /// The device has no location capability.
    #[error("location is not supported on this device")]
    CapabilityUnavailable,

    /// The location provider failed, was denied, or timed out.
    #[error("location unavailable: {reason}")]
    LocationUnavailable {
        /// Why the position could not be resolved.
        reason: String,
    },

    // === Contact Errors ===
    /// A contact field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The persisted contact list could not be parsed.
    #[error("stored data under '{key}' is corrupt: {message}")]
    StorageCorrupt {
        /// Storage key that held the data.
        key: String,
        /// Parser message.
        message: String,
    },

    // === Panic Sequence Errors ===
    /// A newer panic press took over this sequence.
    #[error("panic sequence superseded by a newer request")]
    Superseded,

    /// A feature label did not match any known action.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// A share provider name did not match any known provider.
    #[error("unknown share provider: {0}")]
    UnknownProvider(String),

    /// A share was addressed to a contact position that holds no contact.
    #[error("no contact at position {0}")]
    UnknownContact(usize),

    /// No share strategy is registered for a provider.
    #[error("no share strategy registered for {0}")]
    NoStrategy(String),

    // === Platform Errors ===
    /// Handing a URI to the platform failed.
    #[error("failed to open share target: {0}")]
    Launch(String),

    /// Audio playback failed.
    #[error("audio error: {0}")]
    Audio(String),

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

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for safealert operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a location-unavailable error.
    #[must_use]
    pub fn location_unavailable(reason: impl Into<String>) -> Self {
        Self::LocationUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a validation error for `field`.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a launch error.
    #[must_use]
    pub fn launch(message: impl Into<String>) -> Self {
        Self::Launch(message.into())
    }

    /// Create an audio error.
    #[must_use]
    pub fn audio(message: impl Into<String>) -> Self {
        Self::Audio(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from location acquisition.
    #[must_use]
    pub fn is_location_error(&self) -> bool {
        matches!(
            self,
            Self::CapabilityUnavailable | Self::LocationUnavailable { .. }
        )
    }

    /// Check if this error is a contact validation failure.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The human-readable status line shown for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CapabilityUnavailable => {
                "Geolocation is not supported on this device.".to_string()
            }
            Self::LocationUnavailable { .. } => {
                "Unable to access your location. Please enable location services.".to_string()
            }
            Self::Validation { field, .. } => format!("Please enter a {field}."),
            Self::Superseded => "A newer alert replaced this one.".to_string(),
            Self::UnknownContact(index) => format!("No contact at position {index}."),
            Self::Launch(_) => "Could not open the share app.".to_string(),
            other => format!("Something went wrong: {other}"),
        }
    }
}
