//! Location module for geofire.
//!
//! Provides the value types that flow through the plugin and the geometry
//! the geo stores use to answer radius queries:
//! - [`Coordinate`]: a range-checked latitude/longitude pair
//! - [`LocatedEntry`]: a user's stored location with its write time
//! - [`QueryHit`]: one `{key, latitude, longitude}` element of a query result
//! - Geohash encoding, haversine distance and covering-prefix selection
//!
//! # Example Usage
//!
//! ```
//! use geofire_core::location::{distance_km, Coordinate, LocatedEntry};
//!
//! let home = Coordinate::new(37.0, -122.0).unwrap();
//! let entry = LocatedEntry::new("u1", home, 1_700_000_000_000);
//! assert_eq!(entry.geohash.len(), 10);
//!
//! let nearby = Coordinate::new(37.001, -122.0).unwrap();
//! assert!(distance_km(home, nearby) < 1.0);
//! ```

pub mod geo;
pub mod types;

pub use geo::{distance_km, location_to_geohash, query_prefixes, within_radius};
pub use types::{Coordinate, LocatedEntry, QueryHit};
