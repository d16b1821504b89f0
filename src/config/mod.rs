//! Configuration module
//!
//! Handles loading, parsing and validating the TOML configuration file.
//!
//! # Example
//!
//! ```no_run
//! use comicios::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("comicios.toml")).unwrap();
//! println!("Worker pool size: {}", config.harvest.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, HarvestConfig, HttpConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
