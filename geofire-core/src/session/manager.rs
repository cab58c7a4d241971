//! Proximity query session actor.
//!
//! A [`GeofireSession`] is a cheap, cloneable handle to a single actor task.
//! The actor owns the node binding, the write clock and at most one active
//! [`QuerySession`]. It multiplexes three inputs with `select!`:
//!
//! - commands from handles (initialize, writes, queries, stop, shutdown)
//! - events from the active query's store subscription
//! - the active query's deadline
//!
//! so commands and store callbacks are processed one at a time and never
//! interleave. Starting a query first releases any active subscription and
//! answers its caller with [`GeofireError::Cancelled`].

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::clock::WriteClock;
use super::types::{QueryReply, QuerySession, SessionState};
use crate::config::GeofireConfig;
use crate::error::{GeofireError, Result};
use crate::location::{Coordinate, LocatedEntry, QueryHit};
use crate::provider::{LocationProvider, ProviderError};
use crate::store::{GeoQueryEvent, GeoStore};

enum Command {
    Initialize {
        node: String,
        reply: oneshot::Sender<()>,
    },
    SetLocation {
        key: String,
        coordinate: Coordinate,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveLocation {
        key: String,
        reply: oneshot::Sender<Result<()>>,
    },
    QueryLocations {
        center: Coordinate,
        radius_km: f64,
        reply: QueryReply,
    },
    StopListener {
        reply: oneshot::Sender<()>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running geofire session.
///
/// Every clone talks to the same actor. The actor stops after
/// [`shutdown`](Self::shutdown) or once every handle is dropped; later
/// calls fail with [`GeofireError::Closed`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use geofire_core::location::Coordinate;
/// use geofire_core::provider::FixedLocationProvider;
/// use geofire_core::session::GeofireSession;
/// use geofire_core::store::MemoryGeoStore;
/// use geofire_core::GeofireConfig;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let here = Coordinate::new(37.0, -122.0).unwrap();
/// let session = GeofireSession::spawn(
///     Arc::new(MemoryGeoStore::new()),
///     Arc::new(FixedLocationProvider::at(here)),
///     &GeofireConfig::default(),
/// );
///
/// session.initialize("locations").await.unwrap();
/// session.set_location("u1", here).await.unwrap();
///
/// let hits = session.query_locations(here, 1.0).await.unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].key, "u1");
/// # });
/// ```
#[derive(Debug)]
pub struct GeofireSession<P> {
    commands: mpsc::Sender<Command>,
    provider: Arc<P>,
}

impl<P> Clone for GeofireSession<P> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: LocationProvider> GeofireSession<P> {
    /// Spawns the session actor on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn<S: GeoStore>(store: Arc<S>, provider: Arc<P>, config: &GeofireConfig) -> Self {
        let (commands, inbox) = mpsc::channel(config.command_buffer.max(1));
        let actor = SessionActor::new(store, config);
        tokio::spawn(actor.run(inbox));
        Self { commands, provider }
    }

    /// Binds the session to `node`, cancelling any active query.
    ///
    /// Calling again rebinds to a different node.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`] if `node` is empty.
    pub async fn initialize(&self, node: &str) -> Result<()> {
        if node.is_empty() {
            return Err(GeofireError::InvalidArguments(
                "Node parameter is missing or invalid".to_string(),
            ));
        }
        self.request(|reply| Command::Initialize {
            node: node.to_string(),
            reply,
        })
        .await
    }

    /// Writes `key`'s location with a fresh timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`] for an empty key or invalid
    /// coordinate, [`GeofireError::NotInitialized`] before `initialize`, and
    /// [`GeofireError::StoreWrite`] if the store rejects the write.
    pub async fn set_location(&self, key: &str, coordinate: Coordinate) -> Result<()> {
        validate_key(key)?;
        validate_coordinate(coordinate)?;
        self.request(|reply| Command::SetLocation {
            key: key.to_string(),
            coordinate,
            reply,
        })
        .await?
    }

    /// Same write as [`set_location`](Self::set_location).
    ///
    /// # Errors
    ///
    /// See [`set_location`](Self::set_location).
    pub async fn save_location(&self, key: &str, coordinate: Coordinate) -> Result<()> {
        self.set_location(key, coordinate).await
    }

    /// Deletes `key`'s location. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`] for an empty key,
    /// [`GeofireError::NotInitialized`] before `initialize`, and
    /// [`GeofireError::StoreWrite`] if the store rejects the delete.
    pub async fn remove_location(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.request(|reply| Command::RemoveLocation {
            key: key.to_string(),
            reply,
        })
        .await?
    }

    /// Returns every key within `radius_km` of `center`, in store order.
    ///
    /// Any active query is stopped first, even when the arguments turn out
    /// to be invalid.
    ///
    /// # Errors
    ///
    /// - [`GeofireError::InvalidArguments`] for a non-positive radius or
    ///   invalid center (no store query is opened)
    /// - [`GeofireError::NotInitialized`] before `initialize`
    /// - [`GeofireError::StoreQuery`] if the store fails or times out
    /// - [`GeofireError::Cancelled`] if a later query, `stop_listener`,
    ///   `initialize` or `shutdown` abandons this one
    pub async fn query_locations(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<QueryHit>> {
        if let Err(e) = validate_query(center, radius_km) {
            self.stop_listener().await;
            return Err(e);
        }
        self.request(|reply| Command::QueryLocations {
            center,
            radius_km,
            reply,
        })
        .await?
    }

    /// Tears down the active query, if any. Always succeeds.
    pub async fn stop_listener(&self) {
        // A closed session has nothing left to stop.
        let _ = self.request(|reply| Command::StopListener { reply }).await;
    }

    /// Returns the state of the most recent query session.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::Closed`] once the session has shut down.
    pub async fn state(&self) -> Result<SessionState> {
        self.request(|reply| Command::State { reply }).await
    }

    /// Returns the provider's best current location.
    ///
    /// Answered by the provider directly; it does not queue behind session
    /// commands.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::Unavailable`] with no fix and
    /// [`GeofireError::Provider`] if the provider fails.
    pub async fn get_current_location(&self) -> Result<Coordinate> {
        self.provider
            .current_location()
            .await
            .map_err(|e| match e {
                ProviderError::Unavailable(msg) => GeofireError::Unavailable(msg),
                ProviderError::Failed(msg) => GeofireError::Provider(msg),
            })
    }

    /// Stops any active query and ends the actor.
    pub async fn shutdown(&self) {
        let _ = self.request(|reply| Command::Shutdown { reply }).await;
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| GeofireError::Closed)?;
        response.await.map_err(|_| GeofireError::Closed)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(GeofireError::InvalidArguments(
            "User ID is missing or invalid".to_string(),
        ));
    }
    Ok(())
}

fn validate_coordinate(coordinate: Coordinate) -> Result<()> {
    Coordinate::new(coordinate.latitude, coordinate.longitude).map(|_| ())
}

fn validate_query(center: Coordinate, radius_km: f64) -> Result<()> {
    validate_coordinate(center)?;
    if !(radius_km.is_finite() && radius_km > 0.0) {
        return Err(GeofireError::InvalidArguments(format!(
            "radius {radius_km} km must be a positive number"
        )));
    }
    Ok(())
}

struct SessionActor<S> {
    store: Arc<S>,
    node: Option<String>,
    write_root: Option<String>,
    query_timeout: Option<Duration>,
    active: Option<QuerySession>,
    state: SessionState,
    clock: WriteClock,
    next_query_id: u64,
}

impl<S: GeoStore> SessionActor<S> {
    fn new(store: Arc<S>, config: &GeofireConfig) -> Self {
        Self {
            store,
            node: None,
            write_root: config.write_root.clone(),
            query_timeout: config.query_timeout(),
            active: None,
            state: SessionState::Idle,
            clock: WriteClock::new(),
            next_query_id: 0,
        }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<Command>) {
        debug!("geofire session started");
        loop {
            let deadline = self.active.as_ref().and_then(|session| session.deadline);
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => {
                        if self.handle(command).is_break() {
                            break;
                        }
                    }
                    None => {
                        self.stop_active("all session handles dropped");
                        break;
                    }
                },
                event = next_event(self.active.as_mut()) => self.on_event(event),
                () = expiry(deadline) => self.on_timeout(),
            }
        }
        info!("geofire session stopped");
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Initialize { node, reply } => {
                self.stop_active("session rebound");
                info!("geofire session bound to node {node}");
                self.node = Some(node);
                let _ = reply.send(());
            }
            Command::SetLocation {
                key,
                coordinate,
                reply,
            } => {
                let _ = reply.send(self.set_location(&key, coordinate));
            }
            Command::RemoveLocation { key, reply } => {
                let _ = reply.send(self.remove_location(&key));
            }
            Command::QueryLocations {
                center,
                radius_km,
                reply,
            } => self.start_query(center, radius_km, reply),
            Command::StopListener { reply } => {
                self.stop_active("listener stopped");
                let _ = reply.send(());
            }
            Command::State { reply } => {
                let _ = reply.send(self.state);
            }
            Command::Shutdown { reply } => {
                self.stop_active("session shut down");
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn write_node(&self) -> Result<String> {
        self.write_root
            .as_ref()
            .or(self.node.as_ref())
            .cloned()
            .ok_or(GeofireError::NotInitialized)
    }

    fn set_location(&mut self, key: &str, coordinate: Coordinate) -> Result<()> {
        let node = self.write_node()?;
        let entry = LocatedEntry::new(key, coordinate, self.clock.next());
        debug!("writing {node}/{key}");
        self.store.set_location(&node, &entry).map_err(|e| {
            warn!("write {node}/{key} failed: {e}");
            GeofireError::StoreWrite(e.to_string())
        })
    }

    fn remove_location(&self, key: &str) -> Result<()> {
        let node = self.write_node()?;
        debug!("removing {node}/{key}");
        self.store.remove_location(&node, key).map_err(|e| {
            warn!("remove {node}/{key} failed: {e}");
            GeofireError::StoreWrite(e.to_string())
        })
    }

    fn start_query(&mut self, center: Coordinate, radius_km: f64, reply: QueryReply) {
        self.stop_active("superseded by a new query");

        let Some(node) = self.node.clone() else {
            let _ = reply.send(Err(GeofireError::NotInitialized));
            return;
        };

        match self.store.query_at_location(&node, center, radius_km) {
            Ok(subscription) => {
                self.next_query_id += 1;
                let id = self.next_query_id;
                let deadline = self.query_timeout.map(|timeout| Instant::now() + timeout);
                debug!(
                    "query {id} active on {node} at ({}, {}) within {radius_km} km",
                    center.latitude, center.longitude
                );
                self.active = Some(QuerySession::new(
                    id,
                    center,
                    radius_km,
                    subscription,
                    deadline,
                    reply,
                ));
                self.state = SessionState::Active;
            }
            Err(e) => {
                warn!("query on {node} could not start: {e}");
                self.state = SessionState::Failed;
                let _ = reply.send(Err(GeofireError::StoreQuery(e.to_string())));
            }
        }
    }

    fn on_event(&mut self, event: Option<GeoQueryEvent>) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        match event {
            Some(GeoQueryEvent::KeyEntered { key, coordinate }) => {
                session.accumulated.push(QueryHit::new(key, coordinate));
            }
            // The query answers a single read; later membership changes are not reported.
            Some(GeoQueryEvent::KeyExited { .. } | GeoQueryEvent::KeyMoved { .. }) => {}
            Some(GeoQueryEvent::Ready) => self.finish(Ok(())),
            Some(GeoQueryEvent::Error(message)) => {
                self.finish(Err(GeofireError::StoreQuery(message)));
            }
            None => self.finish(Err(GeofireError::StoreQuery(
                "query stream closed before ready".to_string(),
            ))),
        }
    }

    fn on_timeout(&mut self) {
        let timeout = self.query_timeout.unwrap_or_default();
        self.finish(Err(GeofireError::StoreQuery(format!(
            "query timed out after {}s without a ready signal",
            timeout.as_secs()
        ))));
    }

    fn finish(&mut self, outcome: Result<()>) {
        let Some(session) = self.active.take() else {
            return;
        };
        match &outcome {
            Ok(()) => {
                debug!(
                    "query {} completed with {} keys",
                    session.id,
                    session.accumulated.len()
                );
                self.state = SessionState::Completed;
            }
            Err(e) => {
                warn!("query {} failed: {e}", session.id);
                self.state = SessionState::Failed;
            }
        }
        session.resolve(outcome);
    }

    fn stop_active(&mut self, reason: &str) {
        if let Some(session) = self.active.take() {
            warn!(
                "query {} at ({}, {}) within {} km cancelled: {reason}",
                session.id, session.center.latitude, session.center.longitude, session.radius_km
            );
            session.cancel();
            self.state = SessionState::Idle;
        }
    }
}

async fn next_event(active: Option<&mut QuerySession>) -> Option<GeoQueryEvent> {
    match active {
        Some(session) => session.subscription.next_event().await,
        None => std::future::pending().await,
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FixedLocationProvider;
    use crate::store::{MemoryGeoStore, ScriptedGeoStore};

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn memory_session() -> GeofireSession<FixedLocationProvider> {
        GeofireSession::spawn(
            Arc::new(MemoryGeoStore::new()),
            Arc::new(FixedLocationProvider::unavailable()),
            &GeofireConfig::default(),
        )
    }

    #[tokio::test]
    async fn initialize_rejects_empty_node() {
        let session = memory_session();
        let result = session.initialize("").await;
        assert!(matches!(result, Err(GeofireError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn writes_require_initialize() {
        let session = memory_session();
        let result = session.set_location("u1", coord(1.0, 2.0)).await;
        assert_eq!(result, Err(GeofireError::NotInitialized));

        let result = session.query_locations(coord(1.0, 2.0), 1.0).await;
        assert_eq!(result, Err(GeofireError::NotInitialized));
    }

    #[tokio::test]
    async fn write_root_overrides_node_for_writes() {
        let store = Arc::new(ScriptedGeoStore::new());
        let config = GeofireConfig {
            write_root: Some("locations".to_string()),
            ..GeofireConfig::default()
        };
        let session = GeofireSession::spawn(
            Arc::clone(&store),
            Arc::new(FixedLocationProvider::unavailable()),
            &config,
        );

        session.set_location("u1", coord(1.0, 2.0)).await.unwrap();
        session.initialize("drivers").await.unwrap();
        session.remove_location("u1").await.unwrap();

        let writes = store.writes();
        assert_eq!(writes[0].0, "locations");
        assert_eq!(store.removals(), vec![("locations".to_string(), "u1".to_string())]);
    }

    #[tokio::test]
    async fn timestamps_strictly_increase() {
        let store = Arc::new(ScriptedGeoStore::new());
        let session = GeofireSession::spawn(
            Arc::clone(&store),
            Arc::new(FixedLocationProvider::unavailable()),
            &GeofireConfig::default(),
        );
        session.initialize("locations").await.unwrap();

        for _ in 0..5 {
            session.set_location("u1", coord(1.0, 2.0)).await.unwrap();
        }

        let stamps: Vec<i64> = store.writes().iter().map(|(_, e)| e.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn state_tracks_lifecycle() {
        let store = Arc::new(ScriptedGeoStore::new());
        let session = GeofireSession::spawn(
            Arc::clone(&store),
            Arc::new(FixedLocationProvider::unavailable()),
            &GeofireConfig::default(),
        );
        session.initialize("locations").await.unwrap();
        assert_eq!(session.state().await.unwrap(), SessionState::Idle);

        let handle = session.clone();
        let pending =
            tokio::spawn(async move { handle.query_locations(coord(0.0, 0.0), 1.0).await });
        let query = store.next_query().await.unwrap();
        assert_eq!(session.state().await.unwrap(), SessionState::Active);

        query.emit(GeoQueryEvent::Ready);
        assert!(pending.await.unwrap().unwrap().is_empty());
        assert_eq!(session.state().await.unwrap(), SessionState::Completed);
    }

    #[tokio::test]
    async fn shutdown_closes_session() {
        let session = memory_session();
        session.shutdown().await;
        assert_eq!(session.state().await, Err(GeofireError::Closed));
        // Still a no-op once closed.
        session.stop_listener().await;
    }

    #[tokio::test]
    async fn shutdown_releases_active_query_and_ends_actor() {
        let store = Arc::new(ScriptedGeoStore::new());
        let session = GeofireSession::spawn(
            Arc::clone(&store),
            Arc::new(FixedLocationProvider::unavailable()),
            &GeofireConfig::default(),
        );
        session.initialize("locations").await.unwrap();

        let handle = session.clone();
        let pending = tokio::spawn(async move { handle.query_locations(coord(0.0, 0.0), 1.0).await });
        let query = store.next_query().await.unwrap();

        session.shutdown().await;
        assert!(query.is_released());
        assert_eq!(pending.await.unwrap(), Err(GeofireError::Cancelled));

        session.shutdown().await;
        assert_eq!(session.state().await, Err(GeofireError::Closed));
    }

    #[tokio::test]
    async fn current_location_maps_provider_errors() {
        let session = GeofireSession::spawn(
            Arc::new(MemoryGeoStore::new()),
            Arc::new(FixedLocationProvider::failing("GPS disabled")),
            &GeofireConfig::default(),
        );
        assert_eq!(
            session.get_current_location().await,
            Err(GeofireError::Provider("GPS disabled".to_string()))
        );

        let session = memory_session();
        assert!(matches!(
            session.get_current_location().await,
            Err(GeofireError::Unavailable(_))
        ));
    }
}
