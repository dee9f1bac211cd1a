//! Axum integration for the transit platform.
//!
//! Plugins contribute routes to an [`HttpPipeline`]; the host then mounts
//! the health endpoints (and `/metrics` when Prometheus is enabled), wraps
//! the router with request tracking, and serves it.
//!
//! # Request Flow
//!
//! 1. **Request id** assigned or taken from `x-request-id`
//! 2. **Trace span** opened with the id, method, and URI
//! 3. **Route** to a plugin handler or a platform endpoint
//! 4. **Errors** rendered as `{ "code", "message" }` by [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use axum::routing::get;
//! use transit_platform_web::{HttpPipeline, health_router};
//!
//! let mut pipeline = HttpPipeline::new();
//! pipeline.route("/orders", get(list_orders));
//! pipeline.merge(health_router(health_service));
//! let app = with_request_tracking(pipeline.into_router());
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pipeline;

pub use error::AppError;
pub use handlers::{LIVE_PATH, METRICS_PATH, READY_PATH, health_router, metrics_router};
pub use middleware::{REQUEST_ID_HEADER, with_request_tracking};
pub use pipeline::HttpPipeline;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
