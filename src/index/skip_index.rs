//! Skip Index
//!
//! Sparse array of `SpanMeta` markers, one per `skip_span` postings:
//! - `start_offset`: buffer offset of posting `i * skip_span`
//! - `prev_doc_id`: doc id of posting `i * skip_span - 1`; for span 0 it is
//!   posting 0's own doc id
//!
//! Serialized as `span_count | (prev_doc_id_delta, start_offset_delta)*`,
//! each entry delta-encoded against the previous one.

use super::varint::{decode_varint_at, encode_varint_into};
use crate::types::DocId;
use crate::{Result, SearchError};

/// Number of postings between two skip markers
pub const DEFAULT_SKIP_SPAN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanMeta {
    pub prev_doc_id: DocId,
    pub start_offset: u32,
}

impl SpanMeta {
    pub fn new(prev_doc_id: DocId, start_offset: u32) -> Self {
        Self {
            prev_doc_id,
            start_offset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipIndex {
    spans: Vec<SpanMeta>,
}

impl SkipIndex {
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// Spans are appended in posting order, so both fields never decrease
    pub fn push(&mut self, meta: SpanMeta) {
        debug_assert!(self
            .spans
            .last()
            .map_or(true, |last| last.prev_doc_id <= meta.prev_doc_id
                && last.start_offset < meta.start_offset));
        self.spans.push(meta);
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    #[inline]
    pub fn get(&self, span: usize) -> Option<&SpanMeta> {
        self.spans.get(span)
    }

    pub fn spans(&self) -> &[SpanMeta] {
        &self.spans
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.spans.len() * 3);
        encode_varint_into(self.spans.len() as u32, &mut out);

        let mut prev = SpanMeta::new(0, 0);
        for meta in &self.spans {
            encode_varint_into(meta.prev_doc_id - prev.prev_doc_id, &mut out);
            encode_varint_into(meta.start_offset - prev.start_offset, &mut out);
            prev = *meta;
        }

        out
    }

    /// Inverse of `serialize`, reading at `offset`; returns bytes consumed
    pub fn deserialize(bytes: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cur = offset;
        let count = decode_varint_at(bytes, &mut cur)? as usize;

        // Every entry takes at least two bytes
        if count > bytes.len().saturating_sub(cur) / 2 {
            return Err(SearchError::Corruption(format!(
                "Skip index claims {} spans in {} bytes",
                count,
                bytes.len() - cur
            )));
        }

        let mut spans = Vec::with_capacity(count);
        let mut prev = SpanMeta::new(0, 0);
        for _ in 0..count {
            let doc_delta = decode_varint_at(bytes, &mut cur)?;
            let offset_delta = decode_varint_at(bytes, &mut cur)?;
            let meta = SpanMeta::new(
                prev.prev_doc_id.checked_add(doc_delta).ok_or_else(|| {
                    SearchError::Corruption("Skip index doc id overflows u32".into())
                })?,
                prev.start_offset.checked_add(offset_delta).ok_or_else(|| {
                    SearchError::Corruption("Skip index offset overflows u32".into())
                })?,
            );
            spans.push(meta);
            prev = meta;
        }

        Ok((Self { spans }, cur - offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_round_trip() {
        let mut index = SkipIndex::new();
        index.push(SpanMeta::new(3, 0));
        index.push(SpanMeta::new(3, 8));
        index.push(SpanMeta::new(10, 20));

        let buf = index.serialize();
        // count + 3 * (doc delta, offset delta), all single byte
        assert_eq!(buf, vec![3, 3, 0, 0, 8, 7, 12]);

        let (index2, consumed) = SkipIndex::deserialize(&buf, 0).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(index, index2);
    }

    #[test]
    fn test_empty_index() {
        let index = SkipIndex::new();
        let buf = index.serialize();
        assert_eq!(buf, vec![0]);

        let (index2, consumed) = SkipIndex::deserialize(&buf, 0).unwrap();
        assert_eq!(consumed, 1);
        assert!(index2.is_empty());
    }

    #[test]
    fn test_deserialize_at_offset() {
        let mut index = SkipIndex::new();
        index.push(SpanMeta::new(500, 0));
        index.push(SpanMeta::new(70_000, 4_000));

        let mut bytes = vec![0xAA, 0xBB];
        bytes.extend(index.serialize());

        let (index2, consumed) = SkipIndex::deserialize(&bytes, 2).unwrap();
        assert_eq!(consumed, bytes.len() - 2);
        assert_eq!(index2.get(1), Some(&SpanMeta::new(70_000, 4_000)));
    }

    #[test]
    fn test_truncated_index_is_rejected() {
        let mut index = SkipIndex::new();
        index.push(SpanMeta::new(1, 0));
        index.push(SpanMeta::new(2, 10));
        let buf = index.serialize();

        assert!(SkipIndex::deserialize(&buf[..buf.len() - 1], 0).is_err());
        assert!(SkipIndex::deserialize(&[200], 0).is_err());
    }
}
