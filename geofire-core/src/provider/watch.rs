//! Location provider fed by platform callbacks.

use std::time::Duration;

use log::debug;
use tokio::sync::watch;

use super::{LocationProvider, ProviderError, ProviderResult, UNAVAILABLE_MESSAGE};
use crate::error::Result;
use crate::location::Coordinate;

#[derive(Debug, Clone, PartialEq)]
enum FixState {
    Pending,
    Fix(Coordinate),
    Unavailable(String),
    Failed(String),
}

/// Provider that holds the latest fix pushed by the platform layer.
///
/// The platform reports fixes, loss of permission and failures as they
/// happen. [`current_location`](LocationProvider::current_location)
/// answers from the latest report; before the first report it waits up to
/// the configured bound for one, then reports unavailable.
#[derive(Debug)]
pub struct WatchLocationProvider {
    state: watch::Sender<FixState>,
    wait: Duration,
}

impl WatchLocationProvider {
    /// Creates a provider with no fix that waits up to `wait` for a first one.
    #[must_use]
    pub fn new(wait: Duration) -> Self {
        let (state, _) = watch::channel(FixState::Pending);
        Self { state, wait }
    }

    /// Records a new fix.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`](crate::GeofireError) if
    /// the coordinate is out of range.
    pub fn report(&self, latitude: f64, longitude: f64) -> Result<()> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        debug!("location fix received");
        self.state.send_replace(FixState::Fix(coordinate));
        Ok(())
    }

    /// Records that no fix can be obtained (e.g. permission denied).
    pub fn report_unavailable(&self) {
        self.state
            .send_replace(FixState::Unavailable(UNAVAILABLE_MESSAGE.to_string()));
    }

    /// Records a platform failure.
    pub fn report_failure(&self, message: &str) {
        self.state.send_replace(FixState::Failed(message.to_string()));
    }

    fn answer(state: &FixState) -> Option<ProviderResult<Coordinate>> {
        match state {
            FixState::Pending => None,
            FixState::Fix(coordinate) => Some(Ok(*coordinate)),
            FixState::Unavailable(msg) => Some(Err(ProviderError::Unavailable(msg.clone()))),
            FixState::Failed(msg) => Some(Err(ProviderError::Failed(msg.clone()))),
        }
    }
}

impl LocationProvider for WatchLocationProvider {
    async fn current_location(&self) -> ProviderResult<Coordinate> {
        let mut rx = self.state.subscribe();
        let current = Self::answer(&rx.borrow_and_update());
        if let Some(answer) = current {
            return answer;
        }

        let waited = tokio::time::timeout(
            self.wait,
            rx.wait_for(|state| *state != FixState::Pending),
        )
        .await;

        let answer = match waited {
            Ok(Ok(state)) => Self::answer(&state),
            Ok(Err(_)) | Err(_) => None,
        };
        answer.unwrap_or_else(|| {
            debug!("no location fix within {:?}", self.wait);
            Err(ProviderError::Unavailable(UNAVAILABLE_MESSAGE.to_string()))
        })
    }
}
