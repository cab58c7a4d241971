//! Listener bookkeeping shared by the bundled geo stores.
//!
//! A store opens a query while holding its own data lock and reports every
//! later write through [`QueryRegistry::notify_set`] and
//! [`QueryRegistry::notify_removed`] under the same lock. That keeps the
//! initial snapshot and the follow-up events consistent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use tokio::sync::mpsc;

use super::types::{GeoQuery, GeoQueryEvent};
use crate::location::{within_radius, Coordinate, LocatedEntry};

struct Listener {
    node: String,
    center: Coordinate,
    radius_km: f64,
    inside: HashMap<String, Coordinate>,
    events: mpsc::UnboundedSender<GeoQueryEvent>,
}

impl Listener {
    /// Sends an event, returning `false` if the subscriber is gone.
    fn send(&self, event: GeoQueryEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

/// Registry of open radius queries.
#[derive(Clone, Default)]
pub struct QueryRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl QueryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a query whose initial membership is `initial`.
    ///
    /// Queues one `KeyEntered` per entry in the given order, then `Ready`.
    pub fn open(
        &self,
        node: &str,
        center: Coordinate,
        radius_km: f64,
        initial: Vec<LocatedEntry>,
    ) -> GeoQuery {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inside = HashMap::with_capacity(initial.len());

        for entry in initial {
            inside.insert(entry.key.clone(), entry.coordinate);
            let _ = tx.send(GeoQueryEvent::KeyEntered {
                key: entry.key,
                coordinate: entry.coordinate,
            });
        }
        let _ = tx.send(GeoQueryEvent::Ready);

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(
            id,
            Listener {
                node: node.to_string(),
                center,
                radius_km,
                inside,
                events: tx,
            },
        );
        drop(inner);
        debug!("opened geo query {id} on node {node}");

        let weak = Arc::downgrade(&self.inner);
        GeoQuery::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                if inner.listeners.remove(&id).is_some() {
                    debug!("released geo query {id}");
                }
            }
        })
    }

    /// Reports that `entry` was written under `node`.
    pub fn notify_set(&self, node: &str, entry: &LocatedEntry) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.retain(|_, listener| {
            if listener.node != node {
                return true;
            }
            let now_inside = within_radius(listener.center, listener.radius_km, entry.coordinate);
            let previous = listener.inside.get(&entry.key).copied();

            match (previous, now_inside) {
                (None, true) => {
                    listener.inside.insert(entry.key.clone(), entry.coordinate);
                    listener.send(GeoQueryEvent::KeyEntered {
                        key: entry.key.clone(),
                        coordinate: entry.coordinate,
                    })
                }
                (Some(old), true) if old != entry.coordinate => {
                    listener.inside.insert(entry.key.clone(), entry.coordinate);
                    listener.send(GeoQueryEvent::KeyMoved {
                        key: entry.key.clone(),
                        coordinate: entry.coordinate,
                    })
                }
                (Some(_), false) => {
                    listener.inside.remove(&entry.key);
                    listener.send(GeoQueryEvent::KeyExited {
                        key: entry.key.clone(),
                    })
                }
                _ => !listener.events.is_closed(),
            }
        });
    }

    /// Reports that `key` was deleted under `node`.
    pub fn notify_removed(&self, node: &str, key: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.listeners.retain(|_, listener| {
            if listener.node != node || listener.inside.remove(key).is_none() {
                return true;
            }
            listener.send(GeoQueryEvent::KeyExited {
                key: key.to_string(),
            })
        });
    }

    /// Returns the number of open queries.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

impl std::fmt::Debug for QueryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRegistry")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
