//! Device location providers.
//!
//! The session never talks to a GPS sensor. It asks a [`LocationProvider`]
//! for the best current estimate, and the provider answers with a fix, a
//! "no fix" condition, or an error. Retrying is left to the caller.

mod watch;

use std::future::Future;

use thiserror::Error;

use crate::location::Coordinate;

pub use watch::WatchLocationProvider;

/// Message reported when no fix is available.
pub const UNAVAILABLE_MESSAGE: &str = "Location data unavailable";

/// Errors a location provider can report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// No fix yet, or location permission was denied.
    #[error("{0}")]
    Unavailable(String),

    /// The platform location service failed.
    #[error("{0}")]
    Failed(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Source of the device's current location.
pub trait LocationProvider: Send + Sync + 'static {
    /// Returns the best current estimate of the device location.
    fn current_location(&self) -> impl Future<Output = ProviderResult<Coordinate>> + Send;
}

/// Provider that always returns the same answer.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    answer: ProviderResult<Coordinate>,
}

impl FixedLocationProvider {
    /// Always reports `coordinate`.
    #[must_use]
    pub const fn at(coordinate: Coordinate) -> Self {
        Self {
            answer: Ok(coordinate),
        }
    }

    /// Always reports that no fix is available.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            answer: Err(ProviderError::Unavailable(UNAVAILABLE_MESSAGE.to_string())),
        }
    }

    /// Always fails with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(ProviderError::Failed(message.to_string())),
        }
    }
}

impl LocationProvider for FixedLocationProvider {
    async fn current_location(&self) -> ProviderResult<Coordinate> {
        self.answer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_provider_reports_coordinate() {
        let here = Coordinate::new(37.0, -122.0).unwrap();
        let provider = FixedLocationProvider::at(here);
        assert_eq!(provider.current_location().await, Ok(here));
    }

    #[tokio::test]
    async fn fixed_provider_reports_unavailable() {
        let provider = FixedLocationProvider::unavailable();
        assert_eq!(
            provider.current_location().await,
            Err(ProviderError::Unavailable(UNAVAILABLE_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn fixed_provider_reports_failure() {
        let provider = FixedLocationProvider::failing("GPS disabled");
        let err = provider.current_location().await.unwrap_err();
        assert_eq!(err.to_string(), "GPS disabled");
    }
}
