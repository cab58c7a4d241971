//! Live radius-query subscriptions.

use tokio::sync::mpsc;

use crate::location::Coordinate;

/// One event streamed by a radius query.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoQueryEvent {
    /// A key is inside the query area (initially, or after a write).
    KeyEntered {
        /// The entry's key.
        key: String,
        /// The entry's coordinate.
        coordinate: Coordinate,
    },
    /// A key left the query area or was removed.
    KeyExited {
        /// The entry's key.
        key: String,
    },
    /// A key inside the query area changed position.
    KeyMoved {
        /// The entry's key.
        key: String,
        /// The new coordinate.
        coordinate: Coordinate,
    },
    /// Every key initially inside the area has been reported.
    Ready,
    /// The store failed the query.
    Error(String),
}

type Release = Box<dyn FnOnce() + Send>;

/// A live radius-query subscription.
///
/// Events arrive on an internal channel in store order. Dropping the value,
/// or calling [`cancel`](Self::cancel), unregisters the listener from the
/// store and discards anything still queued.
pub struct GeoQuery {
    events: mpsc::UnboundedReceiver<GeoQueryEvent>,
    release: Option<Release>,
}

impl GeoQuery {
    /// Wraps an event receiver and the action that unregisters it.
    #[must_use]
    pub fn new(
        events: mpsc::UnboundedReceiver<GeoQueryEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next event. Returns `None` once the store side hangs up.
    pub async fn next_event(&mut self) -> Option<GeoQueryEvent> {
        self.events.recv().await
    }

    /// Returns an already-queued event without waiting.
    pub fn try_next_event(&mut self) -> Option<GeoQueryEvent> {
        self.events.try_recv().ok()
    }

    /// Tears the subscription down.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for GeoQuery {
    fn drop(&mut self) {
        self.events.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for GeoQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoQuery")
            .field("released", &self.release.is_none())
            .finish_non_exhaustive()
    }
}
