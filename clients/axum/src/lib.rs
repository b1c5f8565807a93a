//! ETag middleware for Axum.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use etag_guard_axum::{EtagConfig, EtagLayer};
//!
//! let app: Router = Router::new()
//!     .route("/settings/:id", get(|| async { "{}" }))
//!     .layer(EtagLayer::new(EtagConfig::default()));
//! ```

mod conversions;
mod middleware;

pub use etag_guard_core::{EtagConfig, EtagGuard, FingerprintStore};
pub use middleware::{EtagLayer, EtagMiddleware};
