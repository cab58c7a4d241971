//! Geo store abstraction and the bundled stores.
//!
//! A geo store is a key → coordinate registry partitioned by node, with
//! point writes, point deletes and live radius queries. The session only
//! talks to the [`GeoStore`] trait; the geohash index behind a query is the
//! store's business.
//!
//! # Stores
//!
//! | Store | Persistence | Use |
//! |-------|-------------|-----|
//! | [`MemoryGeoStore`] | none | headless hosts, tests |
//! | [`SqliteGeoStore`] | `SQLite` file | on-device storage |
//!
//! # Query Events
//!
//! A query reports its initial membership as [`GeoQueryEvent::KeyEntered`]
//! events followed by exactly one [`GeoQueryEvent::Ready`]. While the
//! [`GeoQuery`] stays open, later writes on the same node produce
//! entered/exited/moved events.

mod error;
mod memory;
mod registry;
#[cfg(any(test, feature = "test-utils"))]
mod scripted;
mod sqlite;
mod types;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryGeoStore;
pub use registry::QueryRegistry;
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::{ScriptedGeoStore, ScriptedQuery};
pub use sqlite::SqliteGeoStore;
pub use types::{GeoQuery, GeoQueryEvent};

use crate::location::{Coordinate, LocatedEntry};

/// Key → coordinate registry with radius queries.
///
/// Implementations must be safe to share between the session actor and
/// any other holder of the store.
pub trait GeoStore: Send + Sync + 'static {
    /// Writes `entry` under `<node>/<entry.key>`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    fn set_location(&self, node: &str, entry: &LocatedEntry) -> StoreResult<()>;

    /// Deletes `<node>/<key>`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete is rejected.
    fn remove_location(&self, node: &str, key: &str) -> StoreResult<()>;

    /// Reads `<node>/<key>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_location(&self, node: &str, key: &str) -> StoreResult<Option<LocatedEntry>>;

    /// Opens a live radius query on `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be started.
    fn query_at_location(
        &self,
        node: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> StoreResult<GeoQuery>;
}
