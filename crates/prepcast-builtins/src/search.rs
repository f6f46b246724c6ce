use async_trait::async_trait;
use prepcast_core::{PrepcastError, PrepcastResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Source of web context for a question. Never required to succeed; callers
/// treat an error like an empty result.
#[async_trait]
pub trait ContextSearcher: Send + Sync {
    /// Run one query and return at most `max_results` hits.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        timeout: Duration,
    ) -> PrepcastResult<Vec<SearchHit>>;
}

/// Searcher that never finds anything. Used when no search API is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSearcher;

#[async_trait]
impl ContextSearcher for NoopSearcher {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
        _timeout: Duration,
    ) -> PrepcastResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

/// Google Custom Search JSON API client.
pub struct GoogleSearcher {
    api_key: String,
    engine_id: String,
    base_url: String,
    http: reqwest::Client,
}

impl GoogleSearcher {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.googleapis.com";
    /// The API returns at most this many results per request.
    pub const MAX_PER_REQUEST: usize = 10;

    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point the client at a different host (self-hosted proxy, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ContextSearcher for GoogleSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        timeout: Duration,
    ) -> PrepcastResult<Vec<SearchHit>> {
        let num = max_results.clamp(1, Self::MAX_PER_REQUEST).to_string();
        let url = format!("{}/customsearch/v1", self.base_url);
        debug!(query = %query, "Google search request");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| PrepcastError::Http(e.to_string()))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PrepcastError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(PrepcastError::Http(format!(
                "Google search API error {status}: {body}"
            )));
        }

        let hits = parse_search_response(&body, max_results);
        info!(query = %query, hits = hits.len(), "Google search completed");
        Ok(hits)
    }
}

/// Extract hits from a Custom Search response. A missing `items` array means
/// no results.
pub fn parse_search_response(body: &serde_json::Value, max_results: usize) -> Vec<SearchHit> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(SearchHit {
                        title: item["title"].as_str()?.to_string(),
                        url: item["link"].as_str()?.to_string(),
                        snippet: item["snippet"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .take(max_results)
                .collect()
        })
        .unwrap_or_default()
}
