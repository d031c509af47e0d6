//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,

    // Extraction service (required)
    pub llama_cloud_api_key: String,
    pub llama_cloud_base_url: String,

    // Synthesis service. The key is optional: its absence must surface as a
    // checked error when audio generation is requested, not as a crash.
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,

    // Blob store (required)
    pub storage_endpoint: String,
    pub storage_bucket: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,

    // Execution backend tuning
    pub worker_count: usize,
    pub job_timeout: Duration,
    pub poll_interval: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load External Service Credentials ---
        let llama_cloud_api_key = required("LLAMA_CLOUD_API_KEY")?;
        let llama_cloud_base_url = std::env::var("LLAMA_CLOUD_BASE_URL")
            .unwrap_or_else(|_| "https://api.cloud.llamaindex.ai".to_string());

        let elevenlabs_api_key = std::env::var("ELEVENLABS_API_KEY").ok();
        let elevenlabs_base_url = std::env::var("ELEVENLABS_BASE_URL")
            .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string());

        let storage_endpoint = required("STORAGE_ENDPOINT")?;
        let storage_bucket = required("STORAGE_BUCKET")?;
        let storage_access_key = required("STORAGE_ACCESS_KEY")?;
        let storage_secret_key = required("STORAGE_SECRET_KEY")?;

        // --- Load Execution Backend Tuning ---
        let worker_count = parse_or("WORKER_COUNT", 4)?;
        let job_timeout = Duration::from_secs(parse_or("JOB_TIMEOUT_SECS", 300)?);
        let poll_interval = Duration::from_secs(parse_or("POLL_INTERVAL_SECS", 5)?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            llama_cloud_api_key,
            llama_cloud_base_url,
            elevenlabs_api_key,
            elevenlabs_base_url,
            storage_endpoint,
            storage_bucket,
            storage_access_key,
            storage_secret_key,
            worker_count,
            job_timeout,
            poll_interval,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
