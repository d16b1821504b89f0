//! HTTP fetch capability
//!
//! The engine core only sees an abstract "fetch a request, get JSON or a
//! transport error" seam. This module provides that seam as the [`Fetcher`]
//! trait plus the reqwest-backed implementation used in production. The trait
//! must be safe to call concurrently from every worker.

use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// A fully-specified request for one job's external call
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    /// GET with query parameters
    Get {
        url: String,
        query: Vec<(String, String)>,
    },

    /// POST with a JSON body
    Post { url: String, body: Value },
}

impl FetchRequest {
    /// Returns the target URL of the request
    pub fn url(&self) -> &str {
        match self {
            FetchRequest::Get { url, .. } => url,
            FetchRequest::Post { url, .. } => url,
        }
    }
}

/// Transport-level fetch failures
///
/// These are recovered locally at the job level: the job produces no result
/// and no children, and the engine moves on. They never abort the scheduler.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        source: reqwest::Error,
    },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        source: reqwest::Error,
    },
}

/// Abstract fetch capability supplied to the engine
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Executes the request and decodes the response body as JSON
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, TransportError>;
}

/// Builds the HTTP client used by the production fetcher
///
/// # Arguments
///
/// * `config` - The HTTP configuration (user agent, timeouts)
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, TransportError> {
        let builder = match request {
            FetchRequest::Get { url, query } => self.client.get(url).query(query),
            FetchRequest::Post { url, body } => self.client.post(url).json(body),
        };

        let response = builder.send().await.map_err(|source| {
            TransportError::Network {
                url: request.url().to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: request.url().to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|source| {
            TransportError::Decode {
                url: request.url().to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher() -> HttpFetcher {
        HttpFetcher::new(&HttpConfig {
            user_agent: "comicios-test/1.0".to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_with_query_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/candidato/hoja-vida"))
            .and(query_param("IdHojaVida", "9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let request = FetchRequest::Get {
            url: format!("{}/api/v1/candidato/hoja-vida", server.uri()),
            query: vec![("IdHojaVida".to_string(), "9".to_string())],
        };
        let value = test_fetcher().fetch(&request).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/expediente/candidato-requisito"))
            .and(body_json(json!({"idProcesoElectoral": 110, "idCandidato": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let request = FetchRequest::Post {
            url: format!("{}/api/v1/expediente/candidato-requisito", server.uri()),
            body: json!({"idProcesoElectoral": 110, "idCandidato": 5}),
        };
        let value = test_fetcher().fetch(&request).await.unwrap();
        assert_eq!(value, json!({"data": []}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request = FetchRequest::Get {
            url: format!("{}/broken", server.uri()),
            query: vec![],
        };
        let err = test_fetcher().fetch(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_non_json_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let request = FetchRequest::Get {
            url: format!("{}/html", server.uri()),
            query: vec![],
        };
        let err = test_fetcher().fetch(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }
}
