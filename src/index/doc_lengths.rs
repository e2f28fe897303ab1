//! Per-document length table with a running average, used for BM25
//! field-length normalization.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::types::DocId;
use crate::{Result, SearchError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocLengthStore {
    lengths: AHashMap<DocId, u32>,
    avg_length: f64,
    last_doc_id: Option<DocId>,
}

impl DocLengthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the length of a new document. Doc ids must be strictly
    /// increasing; updates are not supported.
    pub fn add_length(&mut self, doc_id: DocId, length: u32) -> Result<()> {
        if let Some(last) = self.last_doc_id.filter(|&last| doc_id <= last) {
            return Err(SearchError::ConstructionInvariant(format!(
                "doc id {} is not greater than last doc id {}",
                doc_id, last
            )));
        }

        // Incremental mean
        let count = self.lengths.len() as f64;
        self.avg_length += (length as f64 - self.avg_length) / (count + 1.0);
        self.lengths.insert(doc_id, length);
        self.last_doc_id = Some(doc_id);

        Ok(())
    }

    pub fn length(&self, doc_id: DocId) -> Result<u32> {
        self.lengths
            .get(&doc_id)
            .copied()
            .ok_or(SearchError::UnknownDocument(doc_id))
    }

    pub fn avg_length(&self) -> f64 {
        self.avg_length
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}
