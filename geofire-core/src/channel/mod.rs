//! Method-channel protocol.
//!
//! The Flutter side sends [`MethodCall`]s named after the plugin commands
//! and receives exactly one [`MethodResponse`] each:
//!
//! | Command | Arguments | Success result |
//! |---------|-----------|----------------|
//! | `initialize` | `node` | `true` |
//! | `getCurrentLocation` | none | `{latitude, longitude}` |
//! | `saveLocation` | `userId`, `latitude`, `longitude` | `null` |
//! | `setLocation` | `userId`, `latitude`, `longitude` | `true` |
//! | `removeLocation` | `userId` | `true` |
//! | `queryLocations` | `latitude`, `longitude`, `radiusInKm` | `[{key, latitude, longitude}]` |
//! | `stopListener` | none | `true` |
//!
//! Dispatch lives in [`GeofirePlugin`](crate::GeofirePlugin).

mod args;
mod types;

pub use args::Arguments;
pub use types::{MethodCall, MethodResponse, CHANNEL_NAME};
