//! Property-based tests for radius queries and input validation.
//!
//! These tests verify:
//! - G1: every point inside the query circle lies under one of the scanned
//!   geohash prefixes
//! - G2: a key saved at a point is returned exactly once by a query centred
//!   on that point, on both the in-memory and the SQLite store
//! - G3: out-of-range or non-finite coordinates are rejected before any
//!   store call

// SQLite REAL columns hold the exact f64 that was written.
#![allow(clippy::float_cmp)]

use std::sync::Arc;

use geofire_core::location::{
    distance_km, location_to_geohash, query_prefixes, within_radius, Coordinate, QueryHit,
};
use geofire_core::provider::FixedLocationProvider;
use geofire_core::session::GeofireSession;
use geofire_core::store::{GeoStore, MemoryGeoStore, ScriptedGeoStore, SqliteGeoStore};
use geofire_core::{GeofireConfig, GeofireError};
use proptest::prelude::*;

const EARTH_RADIUS_KM: f64 = 6371.0088;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Point reached by travelling `distance_km` from `origin` on `bearing_deg`.
fn destination(origin: Coordinate, bearing_deg: f64, distance_km: f64) -> Coordinate {
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    let mut longitude = lon2.to_degrees();
    while longitude > 180.0 {
        longitude -= 360.0;
    }
    while longitude < -180.0 {
        longitude += 360.0;
    }
    Coordinate {
        latitude: lat2.to_degrees().clamp(-90.0, 90.0),
        longitude,
    }
}

fn coordinate() -> impl Strategy<Value = Coordinate> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(latitude, longitude)| Coordinate {
        latitude,
        longitude,
    })
}

fn invalid_coordinate() -> impl Strategy<Value = Coordinate> {
    prop_oneof![
        (90.0001f64..1000.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinate {
            latitude: lat,
            longitude: lon,
        }),
        (-1000.0f64..-90.0001, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinate {
            latitude: lat,
            longitude: lon,
        }),
        (-90.0f64..=90.0, 180.0001f64..1000.0).prop_map(|(lat, lon)| Coordinate {
            latitude: lat,
            longitude: lon,
        }),
        Just(Coordinate {
            latitude: f64::NAN,
            longitude: 0.0,
        }),
        Just(Coordinate {
            latitude: 0.0,
            longitude: f64::NEG_INFINITY,
        }),
    ]
}

// ============================================================================
// G1: Prefix coverage
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Any point strictly inside the circle must fall in a scanned cell, or
    /// the query would silently miss it.
    #[test]
    fn g1_points_in_circle_are_covered_by_prefixes(
        center in coordinate(),
        radius_km in 0.001f64..2000.0,
        bearing in 0.0f64..360.0,
        fraction in 0.0f64..0.99,
    ) {
        let point = destination(center, bearing, radius_km * fraction);
        prop_assume!(within_radius(center, radius_km, point));

        if let Some(prefixes) = query_prefixes(center, radius_km) {
            prop_assert!(!prefixes.is_empty());
            prop_assert!(prefixes.len() <= 9);

            let hash = location_to_geohash(point, 10);
            prop_assert!(
                prefixes.iter().any(|prefix| hash.starts_with(prefix.as_str())),
                "point {:?} ({}) at {:.3} km from {:?} not under any of {:?}",
                point,
                hash,
                distance_km(center, point),
                center,
                prefixes
            );
        }
    }

    /// Prefixes all share one length, and that length never exceeds the
    /// precision entries are stored at.
    #[test]
    fn g1_prefixes_have_uniform_length(
        center in coordinate(),
        radius_km in 0.001f64..2000.0,
    ) {
        if let Some(prefixes) = query_prefixes(center, radius_km) {
            let len = prefixes[0].len();
            prop_assert!((1..=10).contains(&len));
            prop_assert!(prefixes.iter().all(|prefix| prefix.len() == len));
        }
    }
}

// ============================================================================
// G2: Save then query
// ============================================================================

fn save_then_query<S: GeoStore>(
    store: S,
    key: &str,
    point: Coordinate,
    radius_km: f64,
) -> Vec<QueryHit> {
    runtime()
        .block_on(async {
            let session = GeofireSession::spawn(
                Arc::new(store),
                Arc::new(FixedLocationProvider::unavailable()),
                &GeofireConfig::default(),
            );
            session.initialize("locations").await?;
            session.save_location(key, point).await?;
            session.query_locations(point, radius_km).await
        })
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn g2_saved_key_is_found_exactly_once_in_memory(
        point in coordinate(),
        key in "[a-zA-Z0-9_-]{1,24}",
        radius_km in 0.001f64..500.0,
    ) {
        let hits = save_then_query(MemoryGeoStore::new(), &key, point, radius_km);
        prop_assert_eq!(hits.iter().filter(|hit| hit.key == key).count(), 1);
        prop_assert_eq!(hits.len(), 1);
    }

    /// Same property through the SQLite prefix range scan.
    #[test]
    fn g2_saved_key_is_found_exactly_once_in_sqlite(
        point in coordinate(),
        key in "[a-zA-Z0-9_-]{1,24}",
        radius_km in 0.001f64..500.0,
    ) {
        let store = SqliteGeoStore::in_memory().unwrap();
        let hits = save_then_query(store, &key, point, radius_km);
        prop_assert_eq!(hits.iter().filter(|hit| hit.key == key).count(), 1);
        prop_assert_eq!(hits.len(), 1);
        prop_assert_eq!(hits[0].latitude, point.latitude);
        prop_assert_eq!(hits[0].longitude, point.longitude);
    }
}

// ============================================================================
// G3: Validation happens before the store
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn g3_invalid_coordinates_are_rejected_locally(bad in invalid_coordinate()) {
        prop_assert!(Coordinate::new(bad.latitude, bad.longitude).is_err());

        let store = Arc::new(ScriptedGeoStore::new());
        let (write, query) = runtime().block_on(async {
            let session = GeofireSession::spawn(
                Arc::clone(&store),
                Arc::new(FixedLocationProvider::unavailable()),
                &GeofireConfig::default(),
            );
            session.initialize("locations").await.unwrap();
            (
                session.set_location("u1", bad).await,
                session.query_locations(bad, 1.0).await,
            )
        });

        prop_assert!(matches!(write, Err(GeofireError::InvalidArguments(_))));
        prop_assert!(matches!(query, Err(GeofireError::InvalidArguments(_))));
        prop_assert!(store.writes().is_empty());
    }

    #[test]
    fn g3_valid_coordinates_are_accepted(point in coordinate()) {
        prop_assert!(Coordinate::new(point.latitude, point.longitude).is_ok());
        prop_assert!(point.is_valid());
    }
}
