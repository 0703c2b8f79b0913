//! Fathom Search - search/extraction client
//!
//! One search+extraction call per query against a Firecrawl-compatible
//! service. The research crates depend only on the `SearchApiClient` trait;
//! the HTTP implementation lives in `firecrawl`.

use async_trait::async_trait;
use fathom_core::{FathomError, FathomResult, SearchConfig};
use serde::{Deserialize, Serialize};

pub mod firecrawl;

pub use firecrawl::FirecrawlClient;

/// One harvested search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Source URL
    pub url: String,
    /// Page title, empty when the service omits it
    pub title: String,
    /// Extracted page content in the configured format
    pub content: String,
}

/// Trait for search/extraction API clients
#[async_trait]
pub trait SearchApiClient: Send + Sync {
    /// Run one search+extraction call, returning at most `limit` records.
    async fn search(&self, query: &str, limit: usize) -> FathomResult<Vec<SearchRecord>>;
}

/// Helper function to create an HTTP client with common configuration
pub(crate) fn create_http_client(config: &SearchConfig) -> FathomResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent)
            .map_err(|e| FathomError::config(format!("Invalid user agent: {}", e)))?,
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| FathomError::service(format!("Failed to create HTTP client: {}", e)))?;

    Ok(client)
}

/// Helper function to turn a non-success HTTP response into a service error
pub(crate) async fn handle_response_error(
    response: reqwest::Response,
    operation: &str,
) -> FathomError {
    let status = response.status();
    let url = response.url().clone();
    let error_body = response.text().await.unwrap_or_default();

    FathomError::service(format!(
        "{}: HTTP {} for {}: {}",
        operation,
        status.as_u16(),
        url,
        if error_body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error")
        } else {
            &error_body
        }
    ))
}
