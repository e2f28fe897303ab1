//! Search engine facade
//!
//! Ties the analyzer, inverted index, doc length store and query processor
//! together. Build phase (`add_document`, `&mut self`) and serve phase
//! (`search`, `&self`) are separated by the borrow checker: once the engine
//! is shared, nothing mutates the posting lists.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::{CacheStats, ResultCache};
use crate::config::EngineConfig;
use crate::index::analyzer::Analyzer;
use crate::index::doc_lengths::DocLengthStore;
use crate::index::inverted_index::InvertedIndex;
use crate::index::posting_list::PostingList;
use crate::query::processor::QueryProcessor;
use crate::storage::snapshot::{read_snapshot, write_snapshot, SnapshotData};
use crate::types::{DocId, DocInfo, OffsetPairs, Term};
use crate::{Result, SearchError};

/// One search request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    pub terms: Vec<Term>,
    pub n_results: usize,
    /// Terms must occur contiguously and in order
    pub is_phrase: bool,
    /// Fill `highlights` in the result entries
    pub return_snippets: bool,
}

impl SearchQuery {
    pub fn new<S: Into<Term>>(terms: impl IntoIterator<Item = S>) -> Self {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            n_results: 10,
            is_phrase: false,
            return_snippets: false,
        }
    }

    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = n_results;
        self
    }

    pub fn phrase(mut self) -> Self {
        self.is_phrase = true;
        self
    }

    pub fn with_snippets(mut self) -> Self {
        self.return_snippets = true;
        self
    }

    fn normalized(&self, case_sensitive: bool) -> Self {
        if case_sensitive {
            return self.clone();
        }
        Self {
            terms: self.terms.iter().map(|t| t.to_lowercase()).collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultEntry {
    pub doc_id: DocId,
    pub score: f64,
    /// Per query term, the byte ranges to highlight (empty unless snippets
    /// were requested)
    pub highlights: Vec<OffsetPairs>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Highest score first
    pub entries: Vec<SearchResultEntry>,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.entries.iter().map(|e| e.doc_id).collect()
    }
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStats {
    pub documents: usize,
    pub terms: usize,
    pub avg_doc_length: f64,
    pub posting_bytes: usize,
    pub documents_indexed: u64,
    pub queries_served: u64,
    pub empty_results: u64,
    #[serde(skip)]
    pub cache: Option<CacheStats>,
}

#[derive(Debug, Default)]
struct Counters {
    documents_indexed: AtomicU64,
    queries_served: AtomicU64,
    empty_results: AtomicU64,
}

pub struct SearchEngine {
    config: EngineConfig,
    analyzer: Analyzer,
    index: InvertedIndex,
    doc_lengths: DocLengthStore,
    next_doc_id: DocId,
    cache: Option<ResultCache<SearchQuery, SearchResult>>,
    counters: Counters,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_parts(
            config.clone(),
            InvertedIndex::new(config.skip_span),
            DocLengthStore::new(),
            0,
        ))
    }

    fn with_parts(
        config: EngineConfig,
        index: InvertedIndex,
        doc_lengths: DocLengthStore,
        next_doc_id: DocId,
    ) -> Self {
        let cache = (config.result_cache_size > 0)
            .then(|| ResultCache::new(config.result_cache_size));

        Self {
            analyzer: Analyzer::new(Box::new(config.tokenizer())),
            config,
            index,
            doc_lengths,
            next_doc_id,
            cache,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn doc_lengths(&self) -> &DocLengthStore {
        &self.doc_lengths
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn term_count(&self) -> usize {
        self.index.term_count()
    }

    /// Analyze and index a raw document body; returns its doc id
    pub fn add_document(&mut self, body: &str) -> Result<DocId> {
        let info = self.analyzer.analyze(body);
        self.add_doc_info(&info)
    }

    /// Index an already analyzed document
    pub fn add_doc_info(&mut self, info: &DocInfo) -> Result<DocId> {
        let doc_id = self.next_doc_id;
        let next = doc_id
            .checked_add(1)
            .ok_or_else(|| SearchError::ConstructionInvariant("doc id space exhausted".into()))?;

        self.index.add_document(doc_id, info)?;
        self.doc_lengths.add_length(doc_id, info.length())?;
        self.next_doc_id = next;

        self.counters.documents_indexed.fetch_add(1, Ordering::Relaxed);
        if let Some(cache) = &self.cache {
            cache.clear();
        }

        Ok(doc_id)
    }

    /// Index many bodies in order
    pub fn add_documents<'b>(&mut self, bodies: impl IntoIterator<Item = &'b str>) -> Result<usize> {
        let mut added = 0;
        for body in bodies {
            self.add_document(body)?;
            added += 1;
        }
        log::info!(
            "Indexed {} documents ({} total, {} terms)",
            added,
            self.doc_count(),
            self.term_count()
        );
        Ok(added)
    }

    /// AND query over all terms, top `n_results` by BM25
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        self.counters.queries_served.fetch_add(1, Ordering::Relaxed);

        if query.n_results == 0 || query.terms.is_empty() {
            self.counters.empty_results.fetch_add(1, Ordering::Relaxed);
            return Ok(SearchResult::default());
        }

        let query = query.normalized(self.config.case_sensitive);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&query) {
                return Ok(SearchResult::clone(&hit));
            }
        }

        let result = self.execute(&query)?;
        if result.is_empty() {
            self.counters.empty_results.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(cache) = &self.cache {
            cache.put(query, Arc::new(result.clone()));
        }

        Ok(result)
    }

    fn execute(&self, query: &SearchQuery) -> Result<SearchResult> {
        let Some(iterators) = self.index.find_iterators(&query.terms) else {
            log::debug!("Query {:?} has a term missing from the index", query.terms);
            return Ok(SearchResult::default());
        };

        let entries = QueryProcessor::new(
            iterators,
            &self.doc_lengths,
            self.doc_count(),
            query.n_results,
            query.is_phrase,
        )
        .process()?;

        let entries = entries
            .into_iter()
            .map(|entry| -> Result<SearchResultEntry> {
                let highlights = if query.return_snippets {
                    entry.offsets_for_highlighting()?
                } else {
                    Vec::new()
                };
                Ok(SearchResultEntry {
                    doc_id: entry.doc_id,
                    score: entry.score,
                    highlights,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchResult { entries })
    }

    /// Search with the configured default result count
    pub fn search_terms<S: Into<Term>>(&self, terms: impl IntoIterator<Item = S>) -> Result<SearchResult> {
        self.search(&SearchQuery::new(terms).with_n_results(self.config.default_n_results))
    }

    /// Run independent queries on the rayon pool
    pub fn search_batch(&self, queries: &[SearchQuery]) -> Vec<Result<SearchResult>> {
        queries.par_iter().map(|query| self.search(query)).collect()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            documents: self.doc_count(),
            terms: self.term_count(),
            avg_doc_length: self.doc_lengths.avg_length(),
            posting_bytes: self.index.byte_count(),
            documents_indexed: self.counters.documents_indexed.load(Ordering::Relaxed),
            queries_served: self.counters.queries_served.load(Ordering::Relaxed),
            empty_results: self.counters.empty_results.load(Ordering::Relaxed),
            cache: self.cache.as_ref().map(ResultCache::stats),
        }
    }

    /// Write a snapshot; returns its size in bytes
    pub fn save(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();

        let mut postings: Vec<(Term, Vec<u8>)> = self
            .index
            .iter()
            .map(|(term, list)| (term.clone(), list.serialize()))
            .collect();
        postings.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let data = SnapshotData {
            config: self.config.clone(),
            next_doc_id: self.next_doc_id,
            doc_lengths: self.doc_lengths.clone(),
            postings,
        };
        let size = write_snapshot(path, &data)?;

        log::info!(
            "Saved snapshot {} ({} docs, {} terms, {} bytes)",
            path.display(),
            self.doc_count(),
            self.term_count(),
            size
        );
        Ok(size)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read_snapshot(path)?;
        data.config.validate()?;

        if data.doc_lengths.len() != data.next_doc_id as usize {
            return Err(SearchError::Corruption(format!(
                "snapshot has {} doc lengths for {} doc ids",
                data.doc_lengths.len(),
                data.next_doc_id
            )));
        }

        let mut lists = Vec::with_capacity(data.postings.len());
        for (term, bytes) in data.postings {
            let (list, consumed) = PostingList::deserialize(&bytes, 0)?;
            if consumed != bytes.len() {
                return Err(SearchError::Corruption(format!(
                    "posting list for {:?} has {} trailing bytes",
                    term,
                    bytes.len() - consumed
                )));
            }
            if !list.is_empty() && list.last_doc_id() >= data.next_doc_id {
                return Err(SearchError::Corruption(format!(
                    "posting list for {:?} references doc {} beyond {}",
                    term,
                    list.last_doc_id(),
                    data.next_doc_id
                )));
            }
            lists.push((term, list));
        }

        let index = InvertedIndex::from_posting_lists(data.config.skip_span, lists);
        let engine = Self::with_parts(data.config, index, data.doc_lengths, data.next_doc_id);

        log::info!(
            "Loaded snapshot {} ({} docs, {} terms)",
            path.display(),
            engine.doc_count(),
            engine.term_count()
        );
        Ok(engine)
    }
}
