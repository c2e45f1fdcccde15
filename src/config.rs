//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cloudinary: CloudinaryConfig,
    pub uploads: UploadsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (default: 3000)
    pub port: u16,
    /// Upper bound on a request body, multipart framing included
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Socket address string to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URI (e.g., "sqlite://data/media-gateway.db")
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

/// Cloudinary credentials and endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API root, without the cloud name
    /// e.g., "https://api.cloudinary.com/v1_1"
    pub api_base_url: String,
    /// Timeout for a single upload request
    pub timeout_seconds: u64,
}

/// Upload handling policy
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Destroy the hosted asset when its record cannot be saved.
    ///
    /// Off by default: the asset stays hosted and is only logged as orphaned.
    pub cleanup_orphans: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MEDIA_GATEWAY__*)
    /// 5. Conventional variables: PORT, DATABASE_URL, CLOUDINARY_*
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self> {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self::from_sources(&["config/default", "config/local"], vars)
    }

    /// Build and validate configuration from the given files and variables
    ///
    /// `files` are optional and applied in order. `vars` stands in for the
    /// process environment.
    fn from_sources(files: &[&str], vars: HashMap<String, String>) -> Result<Self> {
        use config::{Config, Environment, File};

        let var = |key: &str| vars.get(key).filter(|value| !value.is_empty()).cloned();

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.max_upload_bytes", 100 * 1024 * 1024)?
            .set_default("database.url", "sqlite://data/media-gateway.db")?
            .set_default("database.max_connections", 5)?
            .set_default("cloudinary.cloud_name", "")?
            .set_default("cloudinary.api_key", "")?
            .set_default("cloudinary.api_secret", "")?
            .set_default("cloudinary.api_base_url", "https://api.cloudinary.com/v1_1")?
            .set_default("cloudinary.timeout_seconds", 120)?
            .set_default("uploads.cleanup_orphans", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?;

        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("MEDIA_GATEWAY")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("server.port", var("PORT"))?
            .set_override_option("database.url", var("DATABASE_URL"))?
            .set_override_option("cloudinary.cloud_name", var("CLOUDINARY_CLOUD_NAME"))?
            .set_override_option("cloudinary.api_key", var("CLOUDINARY_API_KEY"))?
            .set_override_option("cloudinary.api_secret", var("CLOUDINARY_API_SECRET"))?
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("cloudinary.cloud_name", &self.cloudinary.cloud_name),
            ("cloudinary.api_key", &self.cloudinary.api_key),
            ("cloudinary.api_secret", &self.cloudinary.api_secret),
            ("database.url", &self.database.url),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(crate::error::AppError::Config(format!(
                    "{key} must be set"
                )));
            }
        }

        if url::Url::parse(&self.cloudinary.api_base_url).is_err() {
            return Err(crate::error::AppError::Config(format!(
                "cloudinary.api_base_url is not a valid URL: {}",
                self.cloudinary.api_base_url
            )));
        }

        if self.database.max_connections == 0 {
            return Err(crate::error::AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(crate::error::AppError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
impl AppConfig {
    /// Complete configuration pointing at unroutable collaborators
    pub(crate) fn for_tests() -> Self {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                max_upload_bytes: 1024 * 1024,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "1234567890".to_string(),
                api_secret: "secret".to_string(),
                api_base_url: "https://api.cloudinary.com/v1_1".to_string(),
                timeout_seconds: 30,
            },
            uploads: UploadsConfig {
                cleanup_orphans: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
