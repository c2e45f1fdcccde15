//! Media storage using Cloudinary
//!
//! Talks to the signed REST upload API directly. Files are sent as a single
//! multipart request from memory; nothing touches the local disk.

use axum::async_trait;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

use super::{MediaStore, ResourceKind, UploadError, UploadedAsset};
use crate::config::CloudinaryConfig;
use crate::error::AppError;

/// Cloudinary upload client
pub struct CloudinaryClient {
    http: reqwest::Client,
    /// API root including the cloud name
    /// e.g., "https://api.cloudinary.com/v1_1/demo"
    cloud_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryClient {
    /// Create new Cloudinary client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &CloudinaryConfig) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("media-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            cloud_url: format!(
                "{}/{}",
                config.api_base_url.trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, kind: ResourceKind, action: &str) -> String {
        format!("{}/{}/{}", self.cloud_url, kind, action)
    }

    /// Add `timestamp`, `signature` and `api_key` to the request parameters
    fn signed(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = api_sign_request(&params, &self.api_secret);
        params.insert("signature", signature);
        params.insert("api_key", self.api_key.clone());
        params
    }
}

/// Sign request parameters the way the Cloudinary API expects
///
/// `key=value` pairs sorted by key, joined with `&`, secret appended, SHA-1 hex.
/// `file`, `api_key`, `resource_type` and `cloud_name` never take part.
pub(crate) fn api_sign_request(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(key, value)| {
            !matches!(**key, "file" | "api_key" | "resource_type" | "cloud_name")
                && !value.is_empty()
        })
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha1::digest(format!("{to_sign}{api_secret}").as_bytes()))
}

/// Pull the provider's error message out of a failed response body
fn rejection(status: reqwest::StatusCode, body: String) -> UploadError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    UploadError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn parse_upload_response(body: &str, kind: ResourceKind) -> Result<UploadedAsset, UploadError> {
    let response: UploadResponse = serde_json::from_str(body)
        .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;

    let url = response
        .secure_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| UploadError::MalformedResponse("missing secure_url".to_string()))?;

    match url::Url::parse(&url) {
        Ok(parsed) if parsed.scheme() == "https" => {}
        _ => {
            return Err(UploadError::MalformedResponse(format!(
                "secure_url is not an https URL: {url}"
            )));
        }
    }

    let public_id = response
        .public_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| UploadError::MalformedResponse("missing public_id".to_string()))?;

    Ok(UploadedAsset {
        url,
        public_id,
        kind,
    })
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    /// Upload a file
    ///
    /// # Example
    /// ```ignore
    /// let asset = client.upload(bytes, ResourceKind::Video).await?;
    /// // asset.url: https://res.cloudinary.com/demo/video/upload/v1/abc.mp4
    /// ```
    async fn upload(&self, data: Vec<u8>, kind: ResourceKind) -> Result<UploadedAsset, UploadError> {
        use reqwest::multipart::{Form, Part};

        let size = data.len();
        let form = self
            .signed(BTreeMap::new())
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .part("file", Part::bytes(data).file_name("file"));

        let response = self
            .http
            .post(self.endpoint(kind, "upload"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = rejection(status, body);
            tracing::warn!(%kind, size, error = %error, "Cloudinary rejected upload");
            return Err(error);
        }

        let asset = parse_upload_response(&body, kind)?;
        tracing::debug!(%kind, size, public_id = %asset.public_id, "Cloudinary upload complete");
        Ok(asset)
    }

    async fn destroy(&self, asset: &UploadedAsset) -> Result<(), UploadError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", asset.public_id.clone());

        let response = self
            .http
            .post(self.endpoint(asset.kind, "destroy"))
            .form(&self.signed(params))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(rejection(status, body));
        }

        let response: DestroyResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;

        if response.result != "ok" {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: response.result,
            });
        }

        Ok(())
    }
}
