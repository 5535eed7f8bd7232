use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::RetrievalError;

/// Desktop Chrome profile; several regulatory portals answer unknown
/// clients with an interstitial page or a 403.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_TOP_K: usize = 5;
const DEFAULT_DOCUMENT_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 3;
const DEFAULT_MAX_DOCUMENT_CHARS: usize = 100_000;
const DEFAULT_MAX_FALLBACK_URLS: usize = 3;
const DEFAULT_MIN_DOCUMENT_CHARS: usize = 100;

/// Tuning knobs for the retrieval subsystem.
///
/// Loaded from `config.yml`; every field has a default so a missing file or
/// a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory holding one `<jurisdiction>.json` embeddings dump per
    /// jurisdiction.
    pub embeddings_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Policy-records JSON consumed by the document fallback path.
    pub policy_records_path: Option<PathBuf>,
    pub top_k: usize,
    /// Regulatory documents change rarely; cached text lives for a week.
    pub document_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub max_document_chars: usize,
    pub max_fallback_urls: usize,
    /// Fallback documents shorter than this are treated as noise.
    pub min_document_chars: usize,
    pub user_agent: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embeddings_dir: PathBuf::from("data/embeddings"),
            log_dir: PathBuf::from("logs"),
            policy_records_path: None,
            top_k: DEFAULT_TOP_K,
            document_ttl_secs: DEFAULT_DOCUMENT_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
            max_fallback_urls: DEFAULT_MAX_FALLBACK_URLS,
            min_document_chars: DEFAULT_MIN_DOCUMENT_CHARS,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl RetrievalConfig {
    /// Resolves the config file location: `POLICYCHAT_CONFIG_PATH` wins,
    /// otherwise `config.yml` in the working directory.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("POLICYCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        PathBuf::from("config.yml")
    }

    /// Loads the config from `path`. A missing file yields the defaults;
    /// a present-but-unreadable file is an error.
    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(RetrievalError::internal)?;
        let config: RetrievalConfig =
            serde_yaml::from_str(&contents).map_err(RetrievalError::internal)?;
        Ok(config.normalized())
    }

    /// Clamps the numeric knobs into sane ranges.
    pub fn normalized(mut self) -> Self {
        self.top_k = self.top_k.clamp(1, 50);
        self.max_concurrent_fetches = self.max_concurrent_fetches.clamp(1, 16);
        self.max_fallback_urls = self.max_fallback_urls.clamp(1, 10);
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = DEFAULT_FETCH_TIMEOUT_SECS;
        }
        if self.document_ttl_secs == 0 {
            self.document_ttl_secs = DEFAULT_DOCUMENT_TTL_SECS;
        }
        if self.max_document_chars == 0 {
            self.max_document_chars = DEFAULT_MAX_DOCUMENT_CHARS;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RetrievalConfig::default();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.document_ttl_secs, 604_800);
        assert_eq!(config.max_concurrent_fetches, 3);
        assert!(config.user_agent.contains("Mozilla"));
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let config: RetrievalConfig =
            serde_yaml::from_str("top_k: 8\nembeddings_dir: /srv/embeddings\n").unwrap();
        assert_eq!(config.top_k, 8);
        assert_eq!(config.embeddings_dir, PathBuf::from("/srv/embeddings"));
        assert_eq!(config.fetch_timeout_secs, 15);
    }

    #[test]
    fn normalized_clamps_degenerate_values() {
        let config = RetrievalConfig {
            top_k: 0,
            max_concurrent_fetches: 0,
            fetch_timeout_secs: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.top_k, 1);
        assert_eq!(config.max_concurrent_fetches, 1);
        assert_eq!(config.fetch_timeout_secs, 15);
    }
}
