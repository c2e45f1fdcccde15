//! Common test utilities for E2E tests

#![allow(dead_code)]

use axum::async_trait;
use media_gateway::data::{Database, RecordId, RecordStore, StoreError};
use media_gateway::storage::{MediaStore, ResourceKind, UploadError, UploadedAsset};
use media_gateway::{AppState, config};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// How the fake media provider answers uploads
#[derive(Debug, Clone)]
pub enum FakeMode {
    /// Every upload gets this URL
    Fixed(String),
    /// Every upload gets a fresh URL
    Sequential,
    /// Every upload is rejected
    Failing,
}

/// In-process stand-in for Cloudinary
#[derive(Debug)]
pub struct FakeMediaStore {
    mode: FakeMode,
    /// (size, kind) of every upload attempt
    uploads: Mutex<Vec<(usize, ResourceKind)>>,
    destroyed: Mutex<Vec<String>>,
}

impl FakeMediaStore {
    pub fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            uploads: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
        }
    }

    pub fn uploads(&self) -> Vec<(usize, ResourceKind)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(&self, data: Vec<u8>, kind: ResourceKind) -> Result<UploadedAsset, UploadError> {
        let n = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((data.len(), kind));
            uploads.len()
        };

        let url = match &self.mode {
            FakeMode::Fixed(url) => url.clone(),
            FakeMode::Sequential => format!("https://cdn.example/{kind}/{n}"),
            FakeMode::Failing => {
                return Err(UploadError::Rejected {
                    status: 500,
                    message: "General Error".to_string(),
                });
            }
        };

        Ok(UploadedAsset {
            url,
            public_id: format!("asset-{n}"),
            kind,
        })
    }

    async fn destroy(&self, asset: &UploadedAsset) -> Result<(), UploadError> {
        self.destroyed.lock().unwrap().push(asset.public_id.clone());
        Ok(())
    }
}

/// Record store whose every write fails
pub struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn save(&self, _url: &str) -> Result<RecordId, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub media: Arc<FakeMediaStore>,
    /// Backing store; stays empty when the server runs with failing records
    pub db: Arc<Database>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Server whose provider hands out a fresh URL per upload
    pub async fn new() -> Self {
        Self::start(FakeMode::Sequential, false, false).await
    }

    pub async fn with_media(mode: FakeMode) -> Self {
        Self::start(mode, false, false).await
    }

    /// Server whose record store rejects every write
    pub async fn with_failing_records(cleanup_orphans: bool) -> Self {
        Self::start(FakeMode::Sequential, true, cleanup_orphans).await
    }

    async fn start(mode: FakeMode, failing_records: bool, cleanup_orphans: bool) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                max_upload_bytes: 8 * 1024 * 1024,
            },
            database: config::DatabaseConfig {
                url: format!("sqlite://{}", db_path.display()),
                max_connections: 2,
            },
            cloudinary: config::CloudinaryConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test-key".to_string(),
                api_secret: "test-secret".to_string(),
                api_base_url: "https://api.cloudinary.com/v1_1".to_string(),
                timeout_seconds: 10,
            },
            uploads: config::UploadsConfig { cleanup_orphans },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let db = Arc::new(Database::connect(&config.database).await.unwrap());
        let media = Arc::new(FakeMediaStore::new(mode));
        let records: Arc<dyn RecordStore> = if failing_records {
            Arc::new(FailingRecordStore)
        } else {
            db.clone()
        };

        let state = AppState::from_parts(config, media.clone(), records);

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = media_gateway::build_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            media,
            db,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST a single file part named `field` to `path`
    pub async fn upload(&self, path: &str, field: &str, contents: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(contents).file_name("upload.bin");
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Number of stored records
    pub async fn record_count(&self) -> i64 {
        self.db.count().await.unwrap()
    }
}
