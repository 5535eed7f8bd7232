//! Live document fetching and caching.
//!
//! This module backs the fallback path: when a jurisdiction has no
//! embeddings, the orchestrator fetches its source documents directly,
//! reduced to readable text and cached for a bounded time.
//!
//! - `DocumentCache`: TTL cache keyed by URL with bounded-concurrency
//!   batch fetch
//! - `extract_readable_text`: HTML boilerplate stripping
//! - `select_relevant_urls`: candidate URLs from policy records

mod extract;
mod sources;

pub use extract::{extract_readable_text, TRUNCATION_MARKER};
pub use sources::select_relevant_urls;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use crate::core::config::RetrievalConfig;
use crate::core::errors::RetrievalError;
use crate::policy::PolicyRecords;

/// How a fetched document was classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Html,
    Pdf,
    Text,
    Error,
    /// Any other content type, carried verbatim.
    #[serde(untagged)]
    Other(String),
}

impl DocumentKind {
    pub fn is_error(&self) -> bool {
        matches!(self, DocumentKind::Error)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Html => write!(f, "html"),
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Text => write!(f, "text"),
            DocumentKind::Error => write!(f, "error"),
            DocumentKind::Other(content_type) => write!(f, "{content_type}"),
        }
    }
}

/// A fetched document, cleaned and ready for prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDocument {
    pub url: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
    /// Cleaned-text length in characters.
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub keys: u64,
    pub hits: u64,
    pub misses: u64,
}

/// URL-keyed document cache with time-based expiry.
pub struct DocumentCache {
    store: Cache<String, CachedDocument>,
    http: reqwest::Client,
    max_document_chars: usize,
    max_concurrent: usize,
    max_fallback_urls: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DocumentCache {
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        Self::with_ttl(config, Duration::from_secs(config.document_ttl_secs))
    }

    /// Same wiring with an arbitrary (usually tiny) expiry; used by tests.
    pub fn with_ttl(config: &RetrievalConfig, ttl: Duration) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(RetrievalError::internal)?;

        Ok(Self {
            store: Cache::builder().time_to_live(ttl).build(),
            http,
            max_document_chars: config.max_document_chars,
            max_concurrent: config.max_concurrent_fetches,
            max_fallback_urls: config.max_fallback_urls,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Fetches one URL, serving from cache when fresh.
    ///
    /// Within the TTL window a hit never touches the network, even if the
    /// upstream page has changed since. Failures come back as `error`-kind
    /// documents that are never cached, so the next call retries instead of
    /// replaying a dead link. Concurrent cold fetches of the same URL are
    /// allowed to race; the last writer wins with identical content.
    pub async fn fetch(&self, url: &str) -> CachedDocument {
        if let Some(document) = self.store.get(url).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache hit for {url}");
            return document;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let document = self.fetch_uncached(url).await;
        if !document.kind.is_error() {
            tracing::info!(
                "Cached document from {url} ({}, {} chars)",
                document.kind,
                document.size
            );
            self.store.insert(url.to_string(), document.clone()).await;
        }
        document
    }

    /// Fetches `urls` in sequential batches of `max_concurrent`; within a
    /// batch the fetches run concurrently, so no more than `max_concurrent`
    /// requests are ever in flight. Results come back in input order and a
    /// failed fetch never aborts its siblings.
    pub async fn fetch_many(&self, urls: &[String], max_concurrent: usize) -> Vec<CachedDocument> {
        let batch_size = max_concurrent.max(1);
        let mut results = Vec::with_capacity(urls.len());
        for batch in urls.chunks(batch_size) {
            let fetched =
                futures_util::future::join_all(batch.iter().map(|url| self.fetch(url))).await;
            results.extend(fetched);
        }
        results
    }

    /// Composed fallback operation: candidate URLs from the jurisdiction's
    /// policy records, then a bounded batch fetch.
    pub async fn get_relevant_documents(
        &self,
        jurisdiction: &str,
        category: &str,
        records: &PolicyRecords,
    ) -> Vec<CachedDocument> {
        let urls = select_relevant_urls(jurisdiction, category, records, self.max_fallback_urls);
        if urls.is_empty() {
            return Vec::new();
        }

        tracing::info!(
            "Fetching {} documents for {jurisdiction} - {category}",
            urls.len()
        );
        self.fetch_many(&urls, self.max_concurrent).await
    }

    /// Evicts every cached document. Hit/miss counters describe process
    /// lifetime and survive the flush.
    pub async fn clear(&self) {
        self.store.invalidate_all();
        self.store.run_pending_tasks().await;
        tracing::info!("Document cache cleared");
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.run_pending_tasks().await;
        CacheStats {
            keys: self.store.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    async fn fetch_uncached(&self, url: &str) -> CachedDocument {
        tracing::info!("Fetching {url}");

        let response = match self
            .http
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return error_document(url, err.to_string()),
        };

        if !response.status().is_success() {
            return error_document(url, format!("HTTP {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/html") {
            match response.text().await {
                Ok(html) => document(
                    url,
                    DocumentKind::Html,
                    extract_readable_text(&html, self.max_document_chars),
                ),
                Err(err) => error_document(url, err.to_string()),
            }
        } else if content_type.contains("application/pdf") {
            document(
                url,
                DocumentKind::Pdf,
                "[PDF document - full text parsing requires download]".to_string(),
            )
        } else if content_type.contains("text/plain") {
            match response.text().await {
                Ok(text) => document(url, DocumentKind::Text, text),
                Err(err) => error_document(url, err.to_string()),
            }
        } else {
            document(
                url,
                DocumentKind::Other(content_type.clone()),
                format!("[Document type: {content_type} - may require specialized parsing]"),
            )
        }
    }
}

fn document(url: &str, kind: DocumentKind, text: String) -> CachedDocument {
    let size = text.chars().count();
    CachedDocument {
        url: url.to_string(),
        text,
        kind,
        error: None,
        fetched_at: Utc::now(),
        size,
    }
}

fn error_document(url: &str, reason: String) -> CachedDocument {
    tracing::warn!("Fetch failed for {url}: {reason}");
    CachedDocument {
        url: url.to_string(),
        text: String::new(),
        kind: DocumentKind::Error,
        error: Some(reason),
        fetched_at: Utc::now(),
        size: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_kind_serializes_like_the_wire_format() {
        assert_eq!(serde_json::to_value(DocumentKind::Html).unwrap(), "html");
        assert_eq!(serde_json::to_value(DocumentKind::Error).unwrap(), "error");
        assert_eq!(
            serde_json::to_value(DocumentKind::Other("application/json".to_string())).unwrap(),
            "application/json"
        );

        let kind: DocumentKind = serde_json::from_value(serde_json::json!("pdf")).unwrap();
        assert_eq!(kind, DocumentKind::Pdf);
        let kind: DocumentKind = serde_json::from_value(serde_json::json!("image/png")).unwrap();
        assert_eq!(kind, DocumentKind::Other("image/png".to_string()));
    }

    #[test]
    fn error_documents_carry_the_reason_and_no_text() {
        let doc = error_document("https://example.com", "HTTP 404 Not Found".to_string());
        assert!(doc.kind.is_error());
        assert_eq!(doc.error.as_deref(), Some("HTTP 404 Not Found"));
        assert!(doc.text.is_empty());
        assert_eq!(doc.size, 0);
    }
}
