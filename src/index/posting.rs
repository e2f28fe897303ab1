//! Posting encoding
//!
//! One encoded posting (all integers are varints):
//! ```text
//! content_byte_size | doc_id_delta | term_frequency | offset_region_byte_size |
//!   (start - prev_end, end - start)* | (pos - prev_pos)*
//! ```
//! `content_byte_size` covers everything after itself so a reader can jump to
//! the next posting without touching the offsets or positions.

use super::varint::{encode_varint_into, varint_len, VarintBuffer};
use crate::types::{DocId, OffsetPairs, Position, Positions};
use crate::{Result, SearchError};
use serde::{Deserialize, Serialize};

/// One document's occurrence record for a term
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
    pub offset_pairs: OffsetPairs,
    pub positions: Positions,
}

impl Posting {
    pub fn new(doc_id: DocId, term_frequency: u32) -> Self {
        Self {
            doc_id,
            term_frequency,
            offset_pairs: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn with_offsets(doc_id: DocId, term_frequency: u32, offset_pairs: OffsetPairs) -> Self {
        Self {
            doc_id,
            term_frequency,
            offset_pairs,
            positions: Vec::new(),
        }
    }

    pub fn with_positions(
        doc_id: DocId,
        term_frequency: u32,
        offset_pairs: OffsetPairs,
        positions: Positions,
    ) -> Self {
        Self {
            doc_id,
            term_frequency,
            offset_pairs,
            positions,
        }
    }

    /// Check the ordering the delta encoding relies on: each pair starts at
    /// or after the previous pair's end and ends at or after its own start,
    /// and positions never decrease.
    pub fn validate(&self) -> Result<()> {
        let mut prev_end = 0u32;
        for &(start, end) in &self.offset_pairs {
            if start < prev_end || end < start {
                return Err(SearchError::ConstructionInvariant(format!(
                    "doc {} has offset pair ({}, {}) after end {}",
                    self.doc_id, start, end, prev_end
                )));
            }
            prev_end = end;
        }

        if let Some(pair) = self.positions.windows(2).find(|pair| pair[1] < pair[0]) {
            return Err(SearchError::ConstructionInvariant(format!(
                "doc {} has position {} after {}",
                self.doc_id, pair[1], pair[0]
            )));
        }

        Ok(())
    }

    /// Offset pairs, each delta-encoded against the previous pair's end
    pub fn encode_offsets(&self) -> VarintBuffer {
        let mut buf = VarintBuffer::with_capacity(self.offset_pairs.len() * 2);
        let mut prev_end = 0u32;

        for &(start, end) in &self.offset_pairs {
            debug_assert!(start >= prev_end && end >= start, "offset pairs must be non-decreasing");
            buf.append(start - prev_end);
            buf.append(end - start);
            prev_end = end;
        }

        buf
    }

    /// Positions, each delta-encoded against the previous one
    pub fn encode_positions(&self) -> VarintBuffer {
        let mut buf = VarintBuffer::with_capacity(self.positions.len());
        let mut prev: Position = 0;

        for &pos in &self.positions {
            debug_assert!(pos >= prev, "positions must be non-decreasing");
            buf.append(pos - prev);
            prev = pos;
        }

        buf
    }

    /// Full encoding with the doc id stored as `doc_id_delta`
    pub fn encode(&self, doc_id_delta: u32) -> Vec<u8> {
        let offsets = self.encode_offsets();
        let positions = self.encode_positions();

        let mut content = Vec::with_capacity(
            varint_len(doc_id_delta)
                + varint_len(self.term_frequency)
                + varint_len(offsets.len() as u32)
                + offsets.len()
                + positions.len(),
        );
        encode_varint_into(doc_id_delta, &mut content);
        encode_varint_into(self.term_frequency, &mut content);
        encode_varint_into(offsets.len() as u32, &mut content);
        content.extend_from_slice(offsets.as_bytes());
        content.extend_from_slice(positions.as_bytes());

        let mut out = Vec::with_capacity(content.len() + varint_len(content.len() as u32));
        encode_varint_into(content.len() as u32, &mut out);
        out.extend_from_slice(&content);
        out
    }
}
