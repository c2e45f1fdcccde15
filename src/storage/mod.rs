//! Media storage module
//!
//! Handles:
//! - Forwarding uploaded bytes to the media provider (Cloudinary)
//! - Removing hosted assets when their record cannot be kept

mod cloudinary;

pub use cloudinary::CloudinaryClient;

use axum::async_trait;
use std::fmt;
use thiserror::Error;

/// Provider-side handling class for an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Video,
    /// Stored as-is, no media processing
    Raw,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Raw => "raw",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asset the provider has accepted and is now hosting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Public HTTPS URL of the asset
    pub url: String,
    /// Provider identifier, needed to destroy the asset
    pub public_id: String,
    pub kind: ResourceKind,
}

/// Media provider failure
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request never got a response
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered 2xx but without a usable asset
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Media provider client
///
/// Implementations take a fully buffered file and return where it is hosted.
/// There is no retry and no partial success: an `Ok` always carries an HTTPS URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload `data` as a `kind` resource
    async fn upload(&self, data: Vec<u8>, kind: ResourceKind) -> Result<UploadedAsset, UploadError>;

    /// Remove a previously uploaded asset
    async fn destroy(&self, asset: &UploadedAsset) -> Result<(), UploadError>;
}
