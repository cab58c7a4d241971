//! Error types surfaced to callers of the geofire session.
//!
//! Every variant maps onto one method-channel error code via
//! [`GeofireError::error_code`]. Store and provider messages are carried
//! verbatim so the Flutter side sees exactly what the backend reported.

use thiserror::Error;

/// Method-channel code for malformed or missing caller input.
pub const CODE_INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
/// Method-channel code for "no location fix".
pub const CODE_UNAVAILABLE: &str = "UNAVAILABLE";
/// Method-channel code for store and provider failures, and for commands
/// issued before `initialize`.
pub const CODE_ERROR: &str = "ERROR";
/// Method-channel code for a query abandoned by a later command.
pub const CODE_CANCELLED: &str = "CANCELLED";

/// Error type for geofire operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeofireError {
    /// Caller input failed local validation. Never reaches the store.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// No geo store node has been bound yet.
    #[error("Geo store not initialized: call initialize first")]
    NotInitialized,

    /// The store rejected or failed a write or delete.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// The store failed a radius query (including query timeouts).
    #[error("Store query failed: {0}")]
    StoreQuery(String),

    /// The location provider has no fix.
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    /// The location provider raised an error.
    #[error("Location provider error: {0}")]
    Provider(String),

    /// The query was superseded, stopped, or the session was rebound.
    #[error("Query cancelled before completion")]
    Cancelled,

    /// The session actor has shut down.
    #[error("Geofire session closed")]
    Closed,
}

impl GeofireError {
    /// Returns the method-channel error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) => CODE_INVALID_ARGUMENTS,
            Self::Unavailable(_) => CODE_UNAVAILABLE,
            Self::Cancelled => CODE_CANCELLED,
            Self::NotInitialized
            | Self::StoreWrite(_)
            | Self::StoreQuery(_)
            | Self::Provider(_)
            | Self::Closed => CODE_ERROR,
        }
    }

    /// Returns the message reported alongside the error code.
    ///
    /// Store and provider failures return the backend message unchanged.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidArguments(msg)
            | Self::StoreWrite(msg)
            | Self::StoreQuery(msg)
            | Self::Unavailable(msg)
            | Self::Provider(msg) => msg.clone(),
            Self::NotInitialized | Self::Cancelled | Self::Closed => self.to_string(),
        }
    }
}

/// Result type alias for geofire operations.
pub type Result<T> = std::result::Result<T, GeofireError>;
