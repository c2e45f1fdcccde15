//! Media Gateway - upload files to Cloudinary and record their URLs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - POST /upload, /upload-video, /upload-file                 │
//! │  - /health, /metrics                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                               │
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │     Media Store (storage)     │ │   Record Store (data)     │
//! │  - Cloudinary upload API      │ │  - SQLite (sqlx)          │
//! └───────────────────────────────┘ └───────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `storage`: media provider client
//! - `data`: record persistence
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request. Collaborators sit behind traits so tests
/// can swap them out.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Media provider client
    pub media: Arc<dyn storage::MediaStore>,

    /// Record persistence
    pub records: Arc<dyn data::RecordStore>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to the database and run migrations
    /// 2. Build the Cloudinary client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> error::Result<Self> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database).await?;
        tracing::info!("Database connected");

        let media = storage::CloudinaryClient::new(&config.cloudinary)?;
        tracing::info!(cloud_name = %config.cloudinary.cloud_name, "Cloudinary client initialized");

        Ok(Self::from_parts(config, Arc::new(media), Arc::new(db)))
    }

    /// Assemble state from already constructed collaborators
    pub fn from_parts(
        config: config::AppConfig,
        media: Arc<dyn storage::MediaStore>,
        records: Arc<dyn data::RecordStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            media,
            records,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit};
    use tower_http::{
        catch_panic::CatchPanicLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
        trace::TraceLayer,
    };

    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::upload_router())
        .merge(api::metrics_router::<AppState>())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// A handler panicked: answer like any other internal failure
fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    use axum::response::IntoResponse;

    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    error::AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
