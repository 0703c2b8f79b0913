//! Firecrawl search API client implementation

use async_trait::async_trait;
use fathom_core::{FathomError, FathomResult, SearchConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{create_http_client, handle_response_error, SearchApiClient, SearchRecord};

/// Firecrawl search API client
pub struct FirecrawlClient {
    client: reqwest::Client,
    config: SearchConfig,
}

/// Firecrawl search request body
#[derive(Debug, Serialize)]
struct FirecrawlSearchRequest {
    query: String,
    limit: usize,
    #[serde(rename = "scrapeOptions")]
    scrape_options: ScrapeOptions,
}

/// Scrape options attached to a search request
#[derive(Debug, Serialize)]
struct ScrapeOptions {
    formats: Vec<String>,
}

/// Firecrawl search response
#[derive(Debug, Deserialize)]
struct FirecrawlSearchResponse {
    success: bool,
    data: Option<Vec<FirecrawlSearchItem>>,
}

/// One search result with scraped content
#[derive(Debug, Deserialize)]
struct FirecrawlSearchItem {
    url: String,
    title: Option<String>,
    markdown: Option<String>,
}

impl FirecrawlClient {
    /// Create a new Firecrawl client
    ///
    /// `FIRECRAWL_BASE_URL` and `FIRECRAWL_KEY` override the configured
    /// endpoint and key, matching self-hosted deployments.
    pub fn new(mut config: SearchConfig) -> FathomResult<Self> {
        if let Ok(base_url) = std::env::var("FIRECRAWL_BASE_URL") {
            config.base_url = base_url;
        }
        if config.api_key.is_none() {
            config.api_key = std::env::var("FIRECRAWL_KEY").ok();
        }

        Url::parse(&config.base_url).map_err(|e| {
            FathomError::config(format!(
                "Invalid search API base URL '{}': {}",
                config.base_url, e
            ))
        })?;

        if config.api_key.is_none() {
            warn!("No Firecrawl API key configured, requests may be rejected");
        }

        let client = create_http_client(&config)?;

        info!("Created Firecrawl client for {}", config.base_url);

        Ok(Self { client, config })
    }

    /// Create authorization headers
    fn create_auth_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(ref key) = self.config.api_key {
            if let Ok(auth_value) =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", key))
            {
                headers.insert(reqwest::header::AUTHORIZATION, auth_value);
            }
        }

        headers
    }
}

#[async_trait]
impl SearchApiClient for FirecrawlClient {
    async fn search(&self, query: &str, limit: usize) -> FathomResult<Vec<SearchRecord>> {
        let url = format!("{}/v1/search", self.config.base_url.trim_end_matches('/'));

        let request = FirecrawlSearchRequest {
            query: query.to_string(),
            limit,
            scrape_options: ScrapeOptions {
                formats: vec![self.config.format.clone()],
            },
        };

        debug!(%url, query, limit, "Sending search request");

        let response = self
            .client
            .post(&url)
            .headers(self.create_auth_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| FathomError::service(format!("Failed to reach search API: {}", e)))?;

        if !response.status().is_success() {
            return Err(handle_response_error(response, "search").await);
        }

        let body: FirecrawlSearchResponse = response
            .json()
            .await
            .map_err(|e| FathomError::service(format!("Invalid search API response: {}", e)))?;

        if !body.success {
            return Err(FathomError::service(format!(
                "Search API reported failure for query: {}",
                query
            )));
        }

        let records = into_records(body, limit);
        debug!(query, count = records.len(), "Search returned records");

        Ok(records)
    }
}

/// Map a Firecrawl response onto search records, keeping at most `limit`
fn into_records(body: FirecrawlSearchResponse, limit: usize) -> Vec<SearchRecord> {
    let mut records: Vec<SearchRecord> = body
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|item| SearchRecord {
            url: item.url,
            title: item.title.unwrap_or_default(),
            content: item.markdown.unwrap_or_default(),
        })
        .collect();
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_scrape_options_in_camel_case() {
        let request = FirecrawlSearchRequest {
            query: "rust async runtimes".to_string(),
            limit: 5,
            scrape_options: ScrapeOptions {
                formats: vec!["markdown".to_string()],
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["query"], "rust async runtimes");
        assert_eq!(value["limit"], 5);
        assert_eq!(value["scrapeOptions"]["formats"][0], "markdown");
    }

    #[test]
    fn response_items_map_to_records() {
        let json = r##"{
            "success": true,
            "data": [
                {
                    "url": "https://example.com/a",
                    "title": "Page A",
                    "markdown": "# Heading\n\nBody text."
                },
                {
                    "url": "https://example.com/b"
                }
            ]
        }"##;

        let body: FirecrawlSearchResponse = serde_json::from_str(json).unwrap();
        let records = into_records(body, 5);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "https://example.com/a");
        assert_eq!(records[0].title, "Page A");
        assert!(records[0].content.contains("Body text."));
        assert_eq!(records[1].title, "");
        assert_eq!(records[1].content, "");
    }

    #[test]
    fn records_are_truncated_to_limit() {
        let body = FirecrawlSearchResponse {
            success: true,
            data: Some(
                (0..7)
                    .map(|i| FirecrawlSearchItem {
                        url: format!("https://example.com/{}", i),
                        title: None,
                        markdown: None,
                    })
                    .collect(),
            ),
        };

        assert_eq!(into_records(body, 3).len(), 3);
    }

    #[test]
    fn missing_data_yields_no_records() {
        let json = r#"{"success": true}"#;
        let body: FirecrawlSearchResponse = serde_json::from_str(json).unwrap();
        assert!(into_records(body, 5).is_empty());
    }
}
