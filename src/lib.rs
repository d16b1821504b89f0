//! Comicios: a task-graph harvester for electoral candidate records
//!
//! This crate crawls the JNE electoral platform, where records reference one
//! another: fetching one endpoint reveals identifiers that must be fetched
//! from other endpoints. A bounded worker pool drains a priority queue of
//! fetch jobs, each completed job may fan out into new jobs, and every
//! distinct job key is fetched and persisted at most once per run.

pub mod config;
pub mod dedup;
pub mod env;
pub mod harvest;
pub mod jobs;
pub mod key;
pub mod store;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] harvest::TransportError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error("Malformed response for {key}: {reason}")]
    MalformedResponse { key: String, reason: String },

    #[error("Environment has no base path named '{0}'")]
    MissingApiPath(String),

    #[error("Unknown reference dataset: {0}")]
    UnknownDataset(String),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dedup::DedupIndex;
pub use env::Environment;
pub use harvest::{FetchRequest, Fetcher, Harvester, HttpFetcher, PriorityScheduler};
pub use jobs::JobSpec;
pub use key::{derive_key, ParamValue};
pub use store::{FsStore, ResultStore, StoreError};
