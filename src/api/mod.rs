//! API layer
//!
//! HTTP handlers for:
//! - Media uploads
//! - Metrics (Prometheus)

pub mod metrics;
mod upload;

pub use metrics::metrics_router;
pub use upload::{UPLOAD_ROUTES, UploadResponse, UploadRoute, upload_router};
