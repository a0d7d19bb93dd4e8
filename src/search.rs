//! Best-effort web-search enrichment for deep dives.
//!
//! [`SearchProvider::search`] never fails: any problem, including a missing
//! API key, yields an empty result list. The deep-dive analyzer therefore runs
//! the same code path whether enrichment is available or not.
//!
//! # Backends
//!
//! | Backend | When |
//! |---------|------|
//! | [`TavilySearch`] | `search.api_key` is set |
//! | [`NoSearch`] | no key, or the HTTP client could not be built |

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::models::SearchResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Terms appended to every query to pull in context rather than just headlines.
const QUERY_QUALIFIERS: &str =
    "latest news background causes impact timeline stakeholders expert views";

static INTERROGATIVE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?!？！]").expect("static regex"));

/// A web-search capability.
pub trait SearchProvider {
    /// Return up to `max_results` hits for `query`, or nothing on any failure.
    async fn search(&self, query: &str, max_results: u32) -> Vec<SearchResult>;
}

/// Build the enrichment query for a key event.
///
/// Question and exclamation marks (ASCII and full-width) are removed and the
/// fixed qualifier terms appended.
pub fn build_search_query(event: &str) -> String {
    let core = INTERROGATIVE_PUNCTUATION.replace_all(event, "");
    format!("{} {}", core.trim(), QUERY_QUALIFIERS)
}

/// Search disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSearch;

impl SearchProvider for NoSearch {
    async fn search(&self, _query: &str, _max_results: u32) -> Vec<SearchResult> {
        debug!("Search capability absent; skipping enrichment");
        Vec::new()
    }
}

/// Tavily search API client.
pub struct TavilySearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    depth: String,
    timeout: Duration,
}

impl fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilySearch")
            .field("endpoint", &self.endpoint)
            .field("depth", &self.depth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl TavilySearch {
    pub fn new(config: &SearchConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("daily_brief/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self::with_http(config, http))
    }

    pub fn with_http(config: &SearchConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            depth: config.depth.clone(),
            timeout: config.timeout(),
        }
    }

    async fn try_search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if self.api_key.trim().is_empty() {
            return Err(SearchError::Disabled);
        }
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results,
            search_depth: &self.depth,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::NonSuccessStatus(status.as_u16()));
        }
        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::MalformedResponse(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|hit| {
                let url = hit.url?;
                Some(SearchResult {
                    title: hit.title.unwrap_or_else(|| url.clone()),
                    url,
                    snippet: hit.content.unwrap_or_default(),
                })
            })
            .take(max_results as usize)
            .collect())
    }
}

impl SearchProvider for TavilySearch {
    #[instrument(level = "info", skip_all, fields(max_results = max_results))]
    async fn search(&self, query: &str, max_results: u32) -> Vec<SearchResult> {
        let t0 = Instant::now();
        match self.try_search(query, max_results).await {
            Ok(results) => {
                info!(
                    count = results.len(),
                    elapsed_ms = t0.elapsed().as_millis(),
                    "Search completed"
                );
                results
            }
            Err(e) => {
                warn!(
                    elapsed_ms = t0.elapsed().as_millis(),
                    error = %e,
                    "Search failed; continuing without enrichment"
                );
                Vec::new()
            }
        }
    }
}

/// Runtime-selected search capability.
#[derive(Debug)]
pub enum SearchBackend {
    Tavily(TavilySearch),
    Disabled(NoSearch),
}

impl SearchBackend {
    /// Pick Tavily when a key is configured, otherwise the no-op backend.
    pub fn from_config(config: &SearchConfig) -> Self {
        if !config.is_enabled() {
            info!("No search API key configured; enrichment disabled");
            return SearchBackend::Disabled(NoSearch);
        }
        match TavilySearch::new(config) {
            Ok(client) => {
                info!(endpoint = %config.endpoint, "Search enrichment enabled");
                SearchBackend::Tavily(client)
            }
            Err(e) => {
                warn!(error = %e, "Failed to build search client; enrichment disabled");
                SearchBackend::Disabled(NoSearch)
            }
        }
    }
}

impl SearchProvider for SearchBackend {
    async fn search(&self, query: &str, max_results: u32) -> Vec<SearchResult> {
        match self {
            SearchBackend::Tavily(client) => client.search(query, max_results).await,
            SearchBackend::Disabled(noop) => noop.search(query, max_results).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn tavily_at(base: &str, api_key: &str) -> TavilySearch {
        let config = SearchConfig {
            endpoint: format!("{base}/search"),
            api_key: api_key.to_string(),
            ..SearchConfig::default()
        };
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        TavilySearch::with_http(&config, http)
    }

    #[test]
    fn test_build_search_query_strips_punctuation() {
        let q = build_search_query("Will the central bank cut rates again?!");
        assert_eq!(
            q,
            format!("Will the central bank cut rates again {QUERY_QUALIFIERS}")
        );
    }

    #[test]
    fn test_build_search_query_full_width_marks() {
        let q = build_search_query("央行再次降息？！");
        assert!(q.starts_with("央行再次降息 "));
        assert!(!q.contains('？'));
        assert!(!q.contains('！'));
        assert!(q.ends_with("expert views"));
    }

    #[tokio::test]
    async fn test_no_search_is_empty() {
        assert!(NoSearch.search("anything", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_without_key_is_disabled() {
        let config = SearchConfig {
            api_key: String::new(),
            ..SearchConfig::default()
        };
        let backend = SearchBackend::from_config(&config);
        assert!(matches!(backend, SearchBackend::Disabled(_)));
        assert!(backend.search("query", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_tavily_parses_results() {
        let (base, request_rx) = serve_once(
            "200 OK",
            r#"{"results":[
                {"title":"Rates cut","url":"https://news.example/a","content":"The bank cut rates."},
                {"title":"No url here","content":"dropped"},
                {"url":"https://news.example/b"}
            ]}"#,
        )
        .await;
        let client = tavily_at(&base, "tvly-test");

        let results = client.search("central bank", 5).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rates cut");
        assert_eq!(results[0].snippet, "The bank cut rates.");
        assert_eq!(results[1].title, "https://news.example/b");
        assert_eq!(results[1].snippet, "");

        let request = request_rx.await.unwrap();
        assert!(request.contains(r#""search_depth":"advanced""#));
        assert!(request.contains(r#""max_results":5"#));
        assert!(request.contains(r#""api_key":"tvly-test""#));
    }

    #[tokio::test]
    async fn test_tavily_failure_is_empty() {
        let (base, _rx) = serve_once("401 Unauthorized", r#"{"detail":"bad key"}"#).await;
        let client = tavily_at(&base, "tvly-wrong");
        assert!(client.search("central bank", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_tavily_unreachable_is_empty() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = tavily_at(&format!("http://{addr}"), "tvly-test");
        assert!(client.search("central bank", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_tavily_empty_key_short_circuits() {
        let client = tavily_at("http://127.0.0.1:9", "  ");
        assert!(matches!(
            client.try_search("q", 1).await,
            Err(SearchError::Disabled)
        ));
    }
}
