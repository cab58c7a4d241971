//! Query session state.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{GeofireError, Result};
use crate::location::{Coordinate, QueryHit};
use crate::store::GeoQuery;

/// Lifecycle state of the most recent query session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// No query running.
    #[default]
    Idle,
    /// A query is subscribed and waiting for the store's ready signal.
    Active,
    /// The last query delivered its results.
    Completed,
    /// The last query failed.
    Failed,
}

/// Reply channel for a pending `queryLocations` call.
pub(crate) type QueryReply = oneshot::Sender<Result<Vec<QueryHit>>>;

/// The single in-flight radius query.
///
/// Owns the store subscription; dropping the session releases it.
pub(crate) struct QuerySession {
    pub id: u64,
    pub center: Coordinate,
    pub radius_km: f64,
    pub accumulated: Vec<QueryHit>,
    pub subscription: GeoQuery,
    pub deadline: Option<Instant>,
    reply: Option<QueryReply>,
}

impl QuerySession {
    pub fn new(
        id: u64,
        center: Coordinate,
        radius_km: f64,
        subscription: GeoQuery,
        deadline: Option<Instant>,
        reply: QueryReply,
    ) -> Self {
        Self {
            id,
            center,
            radius_km,
            accumulated: Vec::new(),
            subscription,
            deadline,
            reply: Some(reply),
        }
    }

    /// Releases the subscription and answers the caller exactly once.
    ///
    /// Errors discard whatever was accumulated.
    pub fn resolve(mut self, outcome: Result<()>) {
        let result = outcome.map(|()| std::mem::take(&mut self.accumulated));
        let Self {
            subscription,
            reply,
            ..
        } = self;
        subscription.cancel();
        if let Some(reply) = reply {
            // The caller may have given up waiting.
            let _ = reply.send(result);
        }
    }

    /// Abandons the query, answering the caller with [`GeofireError::Cancelled`].
    pub fn cancel(self) {
        self.resolve(Err(GeofireError::Cancelled));
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn session(reply: QueryReply) -> (QuerySession, mpsc::UnboundedSender<crate::store::GeoQueryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = GeoQuery::new(rx, || {});
        let center = Coordinate::new(0.0, 0.0).unwrap();
        (QuerySession::new(1, center, 1.0, subscription, None, reply), tx)
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[tokio::test]
    async fn resolve_ok_delivers_accumulated() {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (mut session, events) = session(reply_tx);
        session
            .accumulated
            .push(QueryHit::new("u1", Coordinate::new(0.0, 0.0).unwrap()));

        session.resolve(Ok(()));

        let hits = reply_rx.await.unwrap().unwrap();
        assert_eq!(hits.len(), 1);
        assert!(events.is_closed());
    }

    #[tokio::test]
    async fn resolve_err_discards_partial_results() {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (mut session, _events) = session(reply_tx);
        session
            .accumulated
            .push(QueryHit::new("u1", Coordinate::new(0.0, 0.0).unwrap()));

        session.resolve(Err(GeofireError::StoreQuery("boom".to_string())));

        assert_eq!(
            reply_rx.await.unwrap(),
            Err(GeofireError::StoreQuery("boom".to_string()))
        );
    }

    #[tokio::test]
    async fn cancel_answers_cancelled() {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (session, _events) = session(reply_tx);
        session.cancel();
        assert_eq!(reply_rx.await.unwrap(), Err(GeofireError::Cancelled));
    }
}
