//! `SQLite`-backed geo store.
//!
//! Entries live in one `locations` table keyed by `(node, key)` with an
//! index on `(node, geohash)`. Radius queries range-scan the covering
//! geohash prefixes and then filter by great-circle distance.

// SQLite operations need to hold the lock for the duration of the operation,
// and queries must register their listener before the lock is released.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{StoreError, StoreResult};
use super::registry::QueryRegistry;
use super::types::GeoQuery;
use super::GeoStore;
use crate::location::{query_prefixes, within_radius, Coordinate, LocatedEntry};

/// Upper bound appended to a prefix for range scans. Sorts after every
/// geohash character.
const PREFIX_END: char = '~';

/// Geo store persisted in a `SQLite` database.
pub struct SqliteGeoStore {
    conn: Mutex<Connection>,
    registry: QueryRegistry,
}

impl SqliteGeoStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(path: &Path) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Creates an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            registry: QueryRegistry::new(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS locations (
                node TEXT NOT NULL,
                key TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                geohash TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                PRIMARY KEY (node, key)
            );

            CREATE INDEX IF NOT EXISTS idx_locations_geohash
                ON locations(node, geohash);
            ",
        )?;
        Ok(())
    }

    /// Returns the number of open queries.
    #[must_use]
    pub fn open_queries(&self) -> usize {
        self.registry.listener_count()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, f64, f64, String, i64)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn into_entry(
        (key, latitude, longitude, geohash, timestamp): (String, f64, f64, String, i64),
    ) -> StoreResult<LocatedEntry> {
        let coordinate = Coordinate::new(latitude, longitude)
            .map_err(|e| StoreError::InvalidData(format!("{key}: {e}")))?;
        Ok(LocatedEntry {
            key,
            coordinate,
            timestamp,
            geohash,
        })
    }

    fn scan(
        conn: &Connection,
        node: &str,
        prefixes: Option<&[String]>,
    ) -> StoreResult<Vec<LocatedEntry>> {
        let mut rows = Vec::new();
        match prefixes {
            Some(prefixes) => {
                let mut stmt = conn.prepare(
                    r"
                    SELECT key, latitude, longitude, geohash, timestamp
                    FROM locations
                    WHERE node = ?1 AND geohash >= ?2 AND geohash < ?3
                    ORDER BY geohash, key
                    ",
                )?;
                for prefix in prefixes {
                    let end = format!("{prefix}{PREFIX_END}");
                    let found = stmt
                        .query_map(params![node, prefix, end], Self::read_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows.extend(found);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    r"
                    SELECT key, latitude, longitude, geohash, timestamp
                    FROM locations
                    WHERE node = ?1
                    ORDER BY key
                    ",
                )?;
                rows = stmt
                    .query_map(params![node], Self::read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
            }
        }
        rows.into_iter().map(Self::into_entry).collect()
    }
}

impl GeoStore for SqliteGeoStore {
    fn set_location(&self, node: &str, entry: &LocatedEntry) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r"
            INSERT INTO locations (node, key, latitude, longitude, geohash, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(node, key) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                geohash = excluded.geohash,
                timestamp = excluded.timestamp
            ",
            params![
                node,
                &entry.key,
                entry.coordinate.latitude,
                entry.coordinate.longitude,
                &entry.geohash,
                entry.timestamp,
            ],
        )
        .map_err(|e| StoreError::Write(e.to_string()))?;
        self.registry.notify_set(node, entry);
        Ok(())
    }

    fn remove_location(&self, node: &str, key: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM locations WHERE node = ?1 AND key = ?2",
                params![node, key],
            )
            .map_err(|e| StoreError::Write(e.to_string()))?;
        if removed > 0 {
            self.registry.notify_removed(node, key);
        }
        Ok(())
    }

    fn get_location(&self, node: &str, key: &str) -> StoreResult<Option<LocatedEntry>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r"
                SELECT key, latitude, longitude, geohash, timestamp
                FROM locations
                WHERE node = ?1 AND key = ?2
                ",
                params![node, key],
                Self::read_row,
            )
            .optional()?;
        row.map(Self::into_entry).transpose()
    }

    fn query_at_location(
        &self,
        node: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> StoreResult<GeoQuery> {
        let conn = self.lock()?;
        let prefixes = query_prefixes(center, radius_km);
        let initial = Self::scan(&conn, node, prefixes.as_deref())
            .map_err(|e| StoreError::Query(e.to_string()))?
            .into_iter()
            .filter(|entry| within_radius(center, radius_km, entry.coordinate))
            .collect();
        Ok(self.registry.open(node, center, radius_km, initial))
    }
}

impl std::fmt::Debug for SqliteGeoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteGeoStore")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
