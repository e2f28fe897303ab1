//! Ranked query results
//!
//! A `ResultEntry` keeps lazy offset iterators into the posting buffers, so
//! offsets are only decoded for entries that survive top-k selection and are
//! asked for highlights.

use std::cmp::Ordering;

use super::phrase::PositionTable;
use crate::index::iterator::{CompressedPairIterator, PopIterator};
use crate::types::{DocId, OffsetPair, OffsetPairs};
use crate::{Result, SearchError};

#[derive(Debug, Clone)]
pub struct ResultEntry<'a> {
    pub doc_id: DocId,
    pub score: f64,
    pub is_phrase: bool,
    /// Phrase matches; empty for non-phrase queries
    pub position_table: PositionTable,
    /// One per query term, scoped to this document's posting
    offset_iters: Vec<CompressedPairIterator<'a>>,
}

impl<'a> ResultEntry<'a> {
    pub fn new(
        doc_id: DocId,
        score: f64,
        offset_iters: Vec<CompressedPairIterator<'a>>,
        position_table: PositionTable,
        is_phrase: bool,
    ) -> Self {
        Self {
            doc_id,
            score,
            is_phrase,
            position_table,
            offset_iters,
        }
    }

    /// Per-term offsets to highlight: only the phrase-matching occurrences
    /// for phrase queries, every occurrence otherwise
    pub fn offsets_for_highlighting(&self) -> Result<Vec<OffsetPairs>> {
        if self.is_phrase {
            self.filter_offsets_by_position()
        } else {
            Ok(self.expand_offsets())
        }
    }

    fn expand_offsets(&self) -> Vec<OffsetPairs> {
        self.offset_iters.iter().map(|it| it.clone().collect()).collect()
    }

    fn filter_offsets_by_position(&self) -> Result<Vec<OffsetPairs>> {
        let mut table = Vec::with_capacity(self.position_table.num_rows());

        for (row_i, row) in self.position_table.rows().iter().enumerate() {
            let mut offsets = self
                .offset_iters
                .get(row_i)
                .cloned()
                .ok_or_else(|| {
                    SearchError::InvalidData(format!(
                        "position row {} has no offset iterator",
                        row_i
                    ))
                })?;

            let mut pairs = OffsetPairs::with_capacity(row.len());
            // Occurrence index of `pair`
            let mut cur: i64 = -1;
            let mut pair: OffsetPair = (0, 0);
            for info in row {
                while cur < info.term_appearance as i64 {
                    if offsets.is_end() {
                        return Err(SearchError::Corruption(format!(
                            "doc {} has fewer offsets than positions for term {}",
                            self.doc_id, row_i
                        )));
                    }
                    pair = offsets.pop();
                    cur += 1;
                }
                pairs.push(pair);
            }
            table.push(pairs);
        }

        Ok(table)
    }
}

impl PartialEq for ResultEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ResultEntry<'_> {}

impl PartialOrd for ResultEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by score only
impl Ord for ResultEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
    }
}
