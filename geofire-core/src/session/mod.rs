//! Proximity query session.
//!
//! Presents the geo store's streaming radius queries to the caller as a
//! single request/response pair. At most one query is active per session;
//! a new query, `stop_listener`, `initialize` or `shutdown` releases the
//! active subscription before anything else happens.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──query──▶ Active ──ready──▶ Completed
//!                   │  └──error/timeout──▶ Failed
//!                   └──stop/supersede──▶ Idle (caller gets Cancelled)
//! ```

mod clock;
mod manager;
mod types;

pub use clock::WriteClock;
pub use manager::GeofireSession;
pub use types::SessionState;
