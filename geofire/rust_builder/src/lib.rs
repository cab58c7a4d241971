//! Flutter-Rust bridge wrapper for geofire-core.
//!
//! This crate serves as a thin wrapper that re-exports `geofire-core` for
//! integration with the Flutter build system via Cargokit. The [`api`]
//! module holds the types exposed over FFI.

pub mod api;

pub use geofire_core::*;
