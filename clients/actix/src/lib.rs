//! ETag middleware for Actix.

mod conversions;
mod middleware;

pub use etag_guard_core::{EtagConfig, EtagGuard, FingerprintStore};
pub use middleware::{EtagLayer, EtagMiddleware};
