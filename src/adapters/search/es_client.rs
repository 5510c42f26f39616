//! Implements SearchGateway against an Elasticsearch-compatible HTTP API.
//!
//! One `_search` POST per query, trimmed with `filter_path` so only the hit
//! list comes back. Deserialization happens in two steps: the envelope here,
//! the `_source` document via the domain type.

use crate::domain::{ArchiveHit, DomainError, SearchRequest};
use crate::ports::SearchGateway;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Response-trimming filter: keep the hit list, drop the rest.
const FILTER_PATH: &str = "hits.hits._*";

/// Search gateway adapter over plain HTTP.
#[derive(Debug)]
pub struct EsSearchGateway {
    http: reqwest::Client,
    base_url: String,
}

impl EsSearchGateway {
    /// `base_url` must be an absolute http(s) URL; anything else is a
    /// configuration error surfaced at startup, not at the first query.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, DomainError> {
        let base = reqwest::Url::parse(base_url)
            .map_err(|e| DomainError::Config(format!("search host '{base_url}': {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DomainError::Config(format!(
                "search host '{base_url}' must be an http(s) base URL"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DomainError::SearchBackend(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchGateway for EsSearchGateway {
    async fn search(&self, request: &SearchRequest) -> Result<Option<ArchiveHit>, DomainError> {
        let url = format!("{}/{}/_search", self.base_url, request.index_pattern);
        let response = self
            .http
            .post(&url)
            .query(&[("filter_path", FILTER_PATH)])
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| DomainError::SearchBackend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::SearchBackend(format!(
                "search returned {status}: {body}"
            )));
        }

        let envelope: SearchResponse = response
            .json()
            .await
            .map_err(|e| DomainError::SearchBackend(format!("malformed search response: {e}")))?;

        let hit = first_hit(envelope)?;
        debug!(term = %request.term, found = hit.is_some(), "search complete");
        Ok(hit)
    }
}

/// Build the query document for one request.
fn build_body(request: &SearchRequest) -> Value {
    json!({
        "query": {
            "match": {
                "message": {
                    "query": request.term,
                    "fuzziness": request.fuzziness,
                    "operator": request.operator,
                }
            }
        },
        "sort": {
            "timestamp": { "order": request.sort }
        },
        "size": request.limit,
    })
}

// With filter_path the backend answers `{}` when nothing matched, so every
// envelope level defaults.
#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: HitsEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Value,
}

fn first_hit(response: SearchResponse) -> Result<Option<ArchiveHit>, DomainError> {
    let Some(hit) = response.hits.hits.into_iter().next() else {
        return Ok(None);
    };
    let archived =
        serde_json::from_value(hit.source).map_err(|e| DomainError::MalformedHit(e.to_string()))?;
    Ok(Some(archived))
}
