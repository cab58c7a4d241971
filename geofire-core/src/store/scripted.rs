//! Geo store whose query events are driven by the test.
//!
//! Writes land in an in-memory map (and can be made to fail); every radius
//! query is handed to the test as a [`ScriptedQuery`] so it can emit events
//! in any order, never emit `Ready`, or observe when the session releases
//! the subscription.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::error::{StoreError, StoreResult};
use super::types::{GeoQuery, GeoQueryEvent};
use super::GeoStore;
use crate::location::{Coordinate, LocatedEntry};

/// A radius query opened against a [`ScriptedGeoStore`].
#[derive(Debug)]
pub struct ScriptedQuery {
    /// Node the query was opened on.
    pub node: String,
    /// Query center.
    pub center: Coordinate,
    /// Query radius in kilometres.
    pub radius_km: f64,
    events: mpsc::UnboundedSender<GeoQueryEvent>,
    released: Arc<AtomicBool>,
}

impl ScriptedQuery {
    /// Emits an event. Returns `false` if the subscription is gone.
    pub fn emit(&self, event: GeoQueryEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Emits `KeyEntered` for `key` at the given coordinate.
    pub fn enter(&self, key: &str, latitude: f64, longitude: f64) -> bool {
        self.emit(GeoQueryEvent::KeyEntered {
            key: key.to_string(),
            coordinate: Coordinate {
                latitude,
                longitude,
            },
        })
    }

    /// Returns whether the subscriber released the query.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    entries: HashMap<(String, String), LocatedEntry>,
    writes: Vec<(String, LocatedEntry)>,
    removals: Vec<(String, String)>,
    write_error: Option<String>,
    query_error: Option<String>,
}

/// Test double for [`GeoStore`].
#[derive(Debug)]
pub struct ScriptedGeoStore {
    state: Mutex<ScriptedState>,
    opened_tx: mpsc::UnboundedSender<ScriptedQuery>,
    opened_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ScriptedQuery>>,
}

impl Default for ScriptedGeoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGeoStore {
    /// Creates an empty scripted store.
    #[must_use]
    pub fn new() -> Self {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(ScriptedState::default()),
            opened_tx,
            opened_rx: tokio::sync::Mutex::new(opened_rx),
        }
    }

    /// Waits for the next query the session opens.
    pub async fn next_query(&self) -> Option<ScriptedQuery> {
        self.opened_rx.lock().await.recv().await
    }

    /// Makes every later write and delete fail with `message`.
    pub fn fail_writes_with(&self, message: &str) {
        self.state_mut().write_error = Some(message.to_string());
    }

    /// Makes every later query fail to open with `message`.
    pub fn fail_queries_with(&self, message: &str) {
        self.state_mut().query_error = Some(message.to_string());
    }

    /// Returns every successful write as `(node, entry)` in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(String, LocatedEntry)> {
        self.state_mut().writes.clone()
    }

    /// Returns every successful delete as `(node, key)` in order.
    #[must_use]
    pub fn removals(&self) -> Vec<(String, String)> {
        self.state_mut().removals.clone()
    }

    fn state_mut(&self) -> MutexGuard<'_, ScriptedState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl GeoStore for ScriptedGeoStore {
    fn set_location(&self, node: &str, entry: &LocatedEntry) -> StoreResult<()> {
        let mut state = self.state_mut();
        if let Some(message) = &state.write_error {
            return Err(StoreError::Write(message.clone()));
        }
        state
            .entries
            .insert((node.to_string(), entry.key.clone()), entry.clone());
        state.writes.push((node.to_string(), entry.clone()));
        Ok(())
    }

    fn remove_location(&self, node: &str, key: &str) -> StoreResult<()> {
        let mut state = self.state_mut();
        if let Some(message) = &state.write_error {
            return Err(StoreError::Write(message.clone()));
        }
        state.entries.remove(&(node.to_string(), key.to_string()));
        state.removals.push((node.to_string(), key.to_string()));
        Ok(())
    }

    fn get_location(&self, node: &str, key: &str) -> StoreResult<Option<LocatedEntry>> {
        Ok(self
            .state_mut()
            .entries
            .get(&(node.to_string(), key.to_string()))
            .cloned())
    }

    fn query_at_location(
        &self,
        node: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> StoreResult<GeoQuery> {
        if let Some(message) = &self.state_mut().query_error {
            return Err(StoreError::Query(message.clone()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);

        let _ = self.opened_tx.send(ScriptedQuery {
            node: node.to_string(),
            center,
            radius_km,
            events: tx,
            released,
        });

        Ok(GeoQuery::new(rx, move || flag.store(true, Ordering::SeqCst)))
    }
}
