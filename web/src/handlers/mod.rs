//! HTTP handlers mounted by the host.

pub mod health;
pub mod metrics;

pub use health::{LIVE_PATH, READY_PATH, health_router, write_health_response};
pub use metrics::{METRICS_PATH, metrics_router};
