//! Engine configuration
//!
//! Serde-backed so it can live in a JSON file next to a snapshot, and is
//! stored inside the snapshot itself.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::index::analyzer::WhitespaceTokenizer;
use crate::index::skip_index::DEFAULT_SKIP_SPAN;
use crate::{Result, SearchError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Postings between two skip index entries
    pub skip_span: usize,

    /// Result count used when a query does not set one
    pub default_n_results: usize,

    /// Cached query results (0 = cache disabled)
    pub result_cache_size: usize,

    /// Shortest token kept by the analyzer (in chars)
    pub min_token_len: usize,

    /// Longest token kept by the analyzer (in chars)
    pub max_token_len: usize,

    pub case_sensitive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skip_span: DEFAULT_SKIP_SPAN,
            default_n_results: 10,
            result_cache_size: 0,
            min_token_len: 1,
            max_token_len: 64,
            case_sensitive: false,
        }
    }
}

impl EngineConfig {
    /// Tiny skip span so small test corpora still exercise skipping
    pub fn for_testing() -> Self {
        Self {
            skip_span: 2,
            default_n_results: 5,
            ..Default::default()
        }
    }

    /// Defaults plus a result cache
    pub fn for_general() -> Self {
        Self {
            result_cache_size: 1024,
            ..Default::default()
        }
    }

    pub fn with_skip_span(mut self, skip_span: usize) -> Self {
        self.skip_span = skip_span;
        self
    }

    pub fn with_result_cache(mut self, size: usize) -> Self {
        self.result_cache_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.skip_span == 0 {
            return Err(SearchError::Config("skip_span must be positive".into()));
        }
        if self.min_token_len == 0 {
            return Err(SearchError::Config("min_token_len must be positive".into()));
        }
        if self.min_token_len > self.max_token_len {
            return Err(SearchError::Config(format!(
                "min_token_len {} exceeds max_token_len {}",
                self.min_token_len, self.max_token_len
            )));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub(crate) fn tokenizer(&self) -> WhitespaceTokenizer {
        WhitespaceTokenizer {
            case_sensitive: self.case_sensitive,
            min_len: self.min_token_len,
            max_len: self.max_token_len,
        }
    }
}
