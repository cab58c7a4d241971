//! Shared setup for session and channel integration tests.
//!
//! Sessions run against real stores (`MemoryGeoStore`, `SqliteGeoStore`)
//! or against `ScriptedGeoStore` when a test needs to control the order of
//! query events.

#![allow(dead_code)]

use std::sync::Arc;

use geofire_core::location::{Coordinate, QueryHit};
use geofire_core::provider::FixedLocationProvider;
use geofire_core::session::GeofireSession;
use geofire_core::store::{GeoStore, MemoryGeoStore, ScriptedGeoStore};
use geofire_core::GeofireConfig;

pub type TestSession = GeofireSession<FixedLocationProvider>;

pub fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).expect("valid test coordinate")
}

pub fn keys(hits: &[QueryHit]) -> Vec<&str> {
    hits.iter().map(|hit| hit.key.as_str()).collect()
}

pub fn session_on<S: GeoStore>(store: &Arc<S>, config: &GeofireConfig) -> TestSession {
    GeofireSession::spawn(
        Arc::clone(store),
        Arc::new(FixedLocationProvider::unavailable()),
        config,
    )
}

pub async fn memory_session() -> (Arc<MemoryGeoStore>, TestSession) {
    let store = Arc::new(MemoryGeoStore::new());
    let session = session_on(&store, &GeofireConfig::default());
    session
        .initialize("locations")
        .await
        .expect("initialize should succeed");
    (store, session)
}

pub async fn scripted_session(config: &GeofireConfig) -> (Arc<ScriptedGeoStore>, TestSession) {
    let store = Arc::new(ScriptedGeoStore::new());
    let session = session_on(&store, config);
    session
        .initialize("locations")
        .await
        .expect("initialize should succeed");
    (store, session)
}
