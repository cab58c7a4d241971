//! In-process geo store.
//!
//! Keeps entries in ordered maps keyed by node and then by key. Useful for
//! hosts without persistent storage and as the reference behaviour for
//! [`SqliteGeoStore`](super::SqliteGeoStore).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::error::{StoreError, StoreResult};
use super::registry::QueryRegistry;
use super::types::GeoQuery;
use super::GeoStore;
use crate::location::{query_prefixes, within_radius, Coordinate, LocatedEntry};

type Nodes = HashMap<String, BTreeMap<String, LocatedEntry>>;

/// Geo store backed by in-memory maps.
#[derive(Debug, Default)]
pub struct MemoryGeoStore {
    nodes: Mutex<Nodes>,
    registry: QueryRegistry,
}

impl MemoryGeoStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of open queries.
    #[must_use]
    pub fn open_queries(&self) -> usize {
        self.registry.listener_count()
    }

    /// Returns the number of entries stored under `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn entry_count(&self, node: &str) -> StoreResult<usize> {
        Ok(self.lock()?.get(node).map_or(0, BTreeMap::len))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Nodes>> {
        self.nodes
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl GeoStore for MemoryGeoStore {
    fn set_location(&self, node: &str, entry: &LocatedEntry) -> StoreResult<()> {
        let mut nodes = self.lock()?;
        nodes
            .entry(node.to_string())
            .or_default()
            .insert(entry.key.clone(), entry.clone());
        self.registry.notify_set(node, entry);
        drop(nodes);
        Ok(())
    }

    fn remove_location(&self, node: &str, key: &str) -> StoreResult<()> {
        let mut nodes = self.lock()?;
        let removed = nodes
            .get_mut(node)
            .and_then(|entries| entries.remove(key))
            .is_some();
        if removed {
            self.registry.notify_removed(node, key);
        }
        drop(nodes);
        Ok(())
    }

    fn get_location(&self, node: &str, key: &str) -> StoreResult<Option<LocatedEntry>> {
        Ok(self
            .lock()?
            .get(node)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn query_at_location(
        &self,
        node: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> StoreResult<GeoQuery> {
        let nodes = self.lock()?;
        let prefixes = query_prefixes(center, radius_km);

        let initial = nodes
            .get(node)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|entry| {
                prefixes.as_ref().map_or(true, |prefixes| {
                    prefixes.iter().any(|p| entry.geohash.starts_with(p.as_str()))
                })
            })
            .filter(|entry| within_radius(center, radius_km, entry.coordinate))
            .cloned()
            .collect();

        let query = self.registry.open(node, center, radius_km, initial);
        drop(nodes);
        Ok(query)
    }
}
