//! Core error types for slotcaster-core.
//!
//! This module defines the error hierarchy using thiserror. Engine-internal
//! batch operations isolate per-user failures (one bad record never blocks
//! the other users); errors that do propagate carry enough context -- user
//! id, slot id, phase -- for the command surface to report something useful.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for slotcaster-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Preference-store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Scheduling errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Delivery errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Preference-store errors.
///
/// Read failures are recoverable (the store loads as empty and logs);
/// write failures propagate so callers never proceed on stale data.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Data directory could not be resolved or created
    #[error("Failed to resolve data directory: {0}")]
    DataDir(String),

    /// Writing the preference file failed
    #[error("Failed to save preferences to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the preference map failed
    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Scheduling errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A stored slot id is not in the static catalog
    #[error("Unknown slot '{slot_id}' for user '{user_id}'")]
    UnknownSlot { user_id: String, slot_id: String },

    /// A timezone name failed to parse as an IANA identifier
    #[error("Invalid timezone '{0}'")]
    InvalidTimezone(String),

    /// An hour/minute pair is out of range
    #[error("Invalid time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    /// A wall-clock time does not exist in the given zone on the given date
    /// (erased by a DST spring-forward gap)
    #[error("Local time {hour:02}:{minute:02} does not exist in {timezone} on {date}")]
    NonexistentLocalTime {
        hour: u32,
        minute: u32,
        timezone: String,
        date: chrono::NaiveDate,
    },

    /// A recurrence expression is not a supported daily rule
    #[error("Unsupported recurrence rule '{0}': expected 'minute hour * * *'")]
    InvalidRule(String),
}

/// Delivery errors, classified by the known external failure categories.
///
/// Dispatch logs each category distinctly and never retries or propagates;
/// delivery is at-most-once and best-effort.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The sender lacks permission to post to the destination
    #[error("Permission denied for destination '{0}'")]
    PermissionDenied(String),

    /// The destination does not exist
    #[error("Destination '{0}' not found")]
    DestinationNotFound(String),

    /// Access to the destination has been revoked
    #[error("Access revoked for destination '{0}'")]
    AccessRevoked(String),

    /// Anything else
    #[error("Delivery failed: {0}")]
    Other(String),
}

impl DeliveryError {
    /// Short category tag used in dispatch logs.
    pub fn category(&self) -> &'static str {
        match self {
            DeliveryError::PermissionDenied(_) => "permission-denied",
            DeliveryError::DestinationNotFound(_) => "not-found",
            DeliveryError::AccessRevoked(_) => "access-revoked",
            DeliveryError::Other(_) => "other",
        }
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// DEFAULT_TIMEZONE is not a valid IANA identifier
    #[error("Invalid value for '{key}': '{value}' is not an IANA timezone")]
    InvalidTimezone { key: String, value: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
