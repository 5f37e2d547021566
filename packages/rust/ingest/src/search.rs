//! Keyless web lookup through the DuckDuckGo instant-answer API.
//!
//! Used by `review --search` to add background context; results are never
//! treated as a meeting source.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use meetnotes_shared::{MeetNotesError, Result};

const DEFAULT_BASE_URL: &str = "https://api.duckduckgo.com";
const MAX_RELATED: usize = 3;

/// What a lookup found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchDigest {
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub related: Vec<String>,
}

impl SearchDigest {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.source_url.is_none() && self.related.is_empty()
    }

    /// Plain-text rendering for inclusion in a prompt.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "No search results found.".to_string();
        }

        let mut lines = Vec::new();
        if let Some(summary) = &self.summary {
            lines.push(format!("Summary: {summary}"));
        }
        if let Some(url) = &self.source_url {
            lines.push(format!("Source: {url}"));
        }
        if !self.related.is_empty() {
            lines.push("Related Topics:".to_string());
            lines.extend(self.related.iter().map(|t| format!("- {t}")));
        }
        lines.join("\n")
    }
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchDigest>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MeetNotesError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<SearchDigest> {
        if query.trim().is_empty() {
            return Ok(SearchDigest::default());
        }

        let response = self
            .client
            .get(format!("{}/", self.base_url.trim_end_matches('/')))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| MeetNotesError::Network(format!("search failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MeetNotesError::Network(format!("search failed: HTTP {status}")));
        }

        // The API answers with `application/x-javascript`, so parse the text ourselves.
        let body = response
            .text()
            .await
            .map_err(|e| MeetNotesError::Network(format!("search body read failed: {e}")))?;
        let answer: InstantAnswer = serde_json::from_str(&body)
            .map_err(|e| MeetNotesError::parse(format!("invalid search response: {e}")))?;

        let digest = SearchDigest {
            summary: non_empty(answer.abstract_text),
            source_url: non_empty(answer.abstract_url),
            related: answer
                .related_topics
                .iter()
                .filter_map(|t| t.get("Text").and_then(|v| v.as_str()))
                .filter(|t| !t.trim().is_empty())
                .take(MAX_RELATED)
                .map(String::from)
                .collect(),
        };

        debug!(related = digest.related.len(), "search complete");
        Ok(digest)
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
