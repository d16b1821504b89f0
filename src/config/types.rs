use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Harvest engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Size of the worker pool draining the job queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Concurrent fetches during the bootstrap of reference datasets
    #[serde(rename = "bootstrap-parallelism", default = "default_bootstrap_parallelism")]
    pub bootstrap_parallelism: usize,

    /// Root directory for the result cache (one JSON file per job key)
    #[serde(rename = "cache-dir", default = "default_cache_dir")]
    pub cache_dir: String,

    /// URL of the platform's environment-config.json
    #[serde(rename = "bootstrap-url")]
    pub bootstrap_url: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent string sent on every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Overall request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_workers() -> usize {
    10
}

fn default_bootstrap_parallelism() -> usize {
    5
}

fn default_cache_dir() -> String {
    "_cache".to_string()
}

fn default_user_agent() -> String {
    format!("comicios/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
