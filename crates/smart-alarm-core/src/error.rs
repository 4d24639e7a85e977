//! Core error types for smart-alarm-core.
//!
//! Nothing in this hierarchy is fatal to the tick loop. Fetch failures are
//! swallowed and logged by their callers, config failures fall back to
//! defaults, and not-found conditions surface as explicit signals.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for smart-alarm-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote calendar/weather failures
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unknown alarm or device
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Alarm store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid alarm definition fields
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Device identifier errors
    #[error("Device id error: {0}")]
    DeviceId(#[from] DeviceIdError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// OS keyring errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Failure talking to an external data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure (DNS, connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status from the remote API
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response did not have the expected shape
    #[error("Unexpected response: {0}")]
    Parse(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Operation referenced an id that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("alarm '{0}' not found")]
    Alarm(String),

    #[error("device '{0}' not found")]
    Device(String),
}

/// Alarm store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database
    #[error("Failed to open alarm store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Alarm store is locked")]
    Locked,

    /// Stored row could not be decoded
    #[error("Corrupt alarm row '{id}': {message}")]
    Corrupt { id: String, message: String },
}

/// Validation errors for user-supplied alarm fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid weekday '{0}'")]
    InvalidWeekday(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Device identifier file errors.
#[derive(Error, Debug)]
pub enum DeviceIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed device id file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid device ID format: {0}")]
    InvalidFormat(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return FetchError::Parse(err.to_string());
        }
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                FetchError::Auth(err.to_string())
            }
            Some(status) => FetchError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FetchError::Network(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_converts_into_core_error() {
        let err: CoreError = FetchError::Auth("token expired".into()).into();
        assert!(matches!(err, CoreError::Fetch(FetchError::Auth(_))));
        assert!(err.to_string().contains("token expired"));
    }

    #[test]
    fn not_found_message_names_the_id() {
        let err = NotFoundError::Alarm("42".into());
        assert_eq!(err.to_string(), "alarm '42' not found");
    }

    #[test]
    fn generic_sqlite_error_maps_to_query_failed() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::QueryFailed(_)));
    }
}
