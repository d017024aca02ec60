// src/wiki.rs
use anyhow::Result;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// Encyclopedic evidence backend. `search` returns title-like identifiers;
/// `fetch_summary` returns a short plain-text summary, `None` for a missing
/// page. Ambiguous titles resolve to the first alternative inside the
/// implementation.
#[async_trait::async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;
    async fn fetch_summary(&self, title: &str, max_sentences: usize) -> Result<Option<String>>;
}

// opensearch responses are a positional JSON array:
// [query, [titles], [descriptions], [urls]]
type OpenSearchResp = (String, Vec<String>, Vec<String>, Vec<String>);

#[derive(Debug, Deserialize)]
struct QueryResp {
    #[serde(default)]
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    pageprops: Option<PageProps>,
    #[serde(default)]
    links: Option<Vec<Link>>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    #[serde(default)]
    disambiguation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    title: String,
}

/// Keep the leading `max_sentences` of a summary, splitting on periods.
pub fn truncate_sentences(text: &str, max_sentences: usize) -> String {
    let kept = text
        .split('.')
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(".");
    if kept.trim().is_empty() {
        String::new()
    } else {
        format!("{kept}.")
    }
}

/// MediaWiki API client.
pub struct WikiClient {
    http: Client,
    api_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl WikiClient {
    pub fn new(api_url: impl Into<String>, qps: u32, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent("quorum-rs/0.1")
            .build()?;
        let qps = NonZeroU32::new(qps).unwrap_or(nonzero!(1u32));
        Ok(Self {
            http,
            api_url: api_url.into(),
            limiter: RateLimiter::direct(Quota::per_second(qps)),
        })
    }

    async fn query_page(&self, title: &str) -> Result<Option<Page>> {
        self.limiter.until_ready().await;
        let resp: QueryResp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("redirects", "1"),
                ("prop", "extracts|pageprops|links"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("plnamespace", "0"),
                ("pllimit", "5"),
                ("titles", title),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.query.and_then(|q| q.pages.into_iter().next()))
    }
}

#[async_trait::async_trait]
impl EvidenceSource for WikiClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        self.limiter.until_ready().await;
        let limit = max_results.to_string();
        let resp: OpenSearchResp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "opensearch"),
                ("format", "json"),
                ("redirects", "resolve"),
                ("limit", limit.as_str()),
                ("search", query),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(query = %query, results = resp.1.len(), "evidence search");
        Ok(resp.1.into_iter().take(max_results).collect())
    }

    async fn fetch_summary(&self, title: &str, max_sentences: usize) -> Result<Option<String>> {
        let Some(mut page) = self.query_page(title).await? else {
            return Ok(None);
        };
        if page.missing {
            return Ok(None);
        }

        // Disambiguation pages carry no prose; follow the first listed
        // alternative once.
        let is_disambiguation = page
            .pageprops
            .as_ref()
            .is_some_and(|p| p.disambiguation.is_some());
        if is_disambiguation {
            let Some(alternative) = page
                .links
                .as_ref()
                .and_then(|links| links.first())
                .map(|l| l.title.clone())
            else {
                return Ok(None);
            };
            tracing::debug!(title = %title, alternative = %alternative, "resolving disambiguation");
            page = match self.query_page(&alternative).await? {
                Some(p) if !p.missing => p,
                _ => return Ok(None),
            };
        }

        let summary = page
            .extract
            .map(|e| truncate_sentences(&e, max_sentences))
            .unwrap_or_default();
        if summary.is_empty() {
            return Ok(None);
        }
        Ok(Some(summary))
    }
}
