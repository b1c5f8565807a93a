//! ETag middleware for Rocket.
//!
//! Attach [`EtagFairing`] to a `Rocket<Build>`. It mounts one internal route
//! under `/__etag_guard` used to answer rejected preconditions. The route
//! only answers requests the fairing rerouted there; direct requests get 404.

mod conversions;
mod middleware;

pub use etag_guard_core::{EtagConfig, EtagGuard, FingerprintStore};
pub use middleware::EtagFairing;
