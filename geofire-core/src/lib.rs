//! Geofire Core Library
//!
//! Geolocation storage and proximity queries for the `flutter_custom_geofire`
//! plugin. Users' coordinates are written to a geohash-indexed geo store,
//! and radius queries are run as a single request/response on top of the
//! store's streaming query events.
//!
//! # Architecture
//!
//! ```text
//! Flutter method channel
//!     │
//!     ▼
//! GeofirePlugin (command dispatch, argument checks)
//!     │
//!     ▼
//! GeofireSession (actor: node binding, single active query)
//!     ├── GeoStore (MemoryGeoStore / SqliteGeoStore)
//!     └── LocationProvider (WatchLocationProvider)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod channel;
mod config;
mod error;
pub mod location;
pub mod provider;
pub mod session;
pub mod store;

pub use api::GeofirePlugin;
pub use config::{ConfigError, GeofireConfig};
pub use error::{GeofireError, Result};
