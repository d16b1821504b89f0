//! Shared environment of API base paths
//!
//! The platform publishes an `environment-config.json` whose `env` object
//! maps names like `apiPath`, `apiPath2`, ... to service base URLs. The map
//! is assembled once during bootstrap and is read-only afterwards; job
//! actions share it through an `Arc` and never mutate it, so reads need no
//! synchronization.

use crate::HarvestError;
use serde_json::Value;
use std::collections::HashMap;

/// Immutable map of API base paths plus the bootstrap URL itself
#[derive(Debug, Clone)]
pub struct Environment {
    bootstrap_url: String,
    paths: HashMap<String, String>,
}

impl Environment {
    /// Creates an environment that only knows its bootstrap URL
    ///
    /// This is the stage-zero environment used to fetch the environment
    /// config itself; every `base` lookup on it fails.
    pub fn bootstrap_only(bootstrap_url: impl Into<String>) -> Self {
        Self {
            bootstrap_url: bootstrap_url.into(),
            paths: HashMap::new(),
        }
    }

    /// Builds the full environment from a fetched environment config
    ///
    /// Reads the `env` object of the payload and keeps its string-valued
    /// entries as base paths.
    pub fn from_bootstrap(
        bootstrap_url: impl Into<String>,
        payload: &Value,
    ) -> Result<Self, HarvestError> {
        let env = payload
            .get("env")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                HarvestError::Bootstrap("environment config has no 'env' object".to_string())
            })?;

        let paths = env
            .iter()
            .filter_map(|(name, value)| {
                value.as_str().map(|s| (name.clone(), s.to_string()))
            })
            .collect();

        Ok(Self {
            bootstrap_url: bootstrap_url.into(),
            paths,
        })
    }

    /// Returns the URL the environment config was fetched from
    pub fn bootstrap_url(&self) -> &str {
        &self.bootstrap_url
    }

    /// Looks up a service base path by name (e.g. "apiPath5")
    pub fn base(&self, name: &str) -> Result<&str, HarvestError> {
        self.paths
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| HarvestError::MissingApiPath(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_bootstrap_reads_env_object() {
        let payload = json!({
            "env": {
                "apiPath": "https://api.example.test",
                "apiPath2": "https://api2.example.test",
                "buildNumber": 42
            }
        });
        let env = Environment::from_bootstrap("https://boot.example.test", &payload).unwrap();

        assert_eq!(env.base("apiPath").unwrap(), "https://api.example.test");
        assert_eq!(env.base("apiPath2").unwrap(), "https://api2.example.test");
        assert_eq!(env.bootstrap_url(), "https://boot.example.test");
        // Non-string entries are not base paths.
        assert!(matches!(
            env.base("buildNumber"),
            Err(HarvestError::MissingApiPath(_))
        ));
    }

    #[test]
    fn test_missing_env_object_is_a_bootstrap_error() {
        let result = Environment::from_bootstrap("u", &json!({"other": {}}));
        assert!(matches!(result, Err(HarvestError::Bootstrap(_))));
    }

    #[test]
    fn test_bootstrap_only_knows_no_paths() {
        let env = Environment::bootstrap_only("https://boot.example.test");
        assert!(matches!(
            env.base("apiPath"),
            Err(HarvestError::MissingApiPath(_))
        ));
    }
}
