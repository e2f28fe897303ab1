//! Core value types shared by the index and query layers

use serde::{Deserialize, Serialize};

/// Document ID (32-bit, assigned sequentially at ingestion)
pub type DocId = u32;

/// Token position in a document (0-based token ordinal)
pub type Position = u32;

/// Index term (opaque string key)
pub type Term = String;

pub type TermList = Vec<Term>;

/// Byte range `(start, end)` of one token occurrence in the document body,
/// both ends inclusive
pub type OffsetPair = (u32, u32);

pub type OffsetPairs = Vec<OffsetPair>;

pub type Positions = Vec<Position>;

/// Per-document ingestion record.
///
/// `tokens[i]` is a distinct term of the document, `offset_pairs[i]` and
/// `positions[i]` list every occurrence of that term in body order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    pub tokens: TermList,
    pub offset_pairs: Vec<OffsetPairs>,
    pub positions: Vec<Positions>,
}

impl DocInfo {
    pub fn new(tokens: TermList, offset_pairs: Vec<OffsetPairs>, positions: Vec<Positions>) -> Self {
        Self {
            tokens,
            offset_pairs,
            positions,
        }
    }

    /// Number of token occurrences in the document (BM25 field length)
    pub fn length(&self) -> u32 {
        self.offset_pairs.iter().map(|p| p.len() as u32).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
