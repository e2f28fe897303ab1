//! Delta-encoded posting list
//!
//! Owns the Posting Buffer (postings encoded back-to-back, each prefixed by
//! its content byte size) and the Skip Index for one term.
//!
//! Serialized layout (varints):
//! ```text
//! last_doc_id | posting_count | skip_span | data_byte_len | data | index_byte_len | index_data
//! ```
//!
//! Built once by a single writer, then shared read-only by any number of
//! iterators.

use super::iterator::PostingListIterator;
use super::posting::Posting;
use super::skip_index::{SkipIndex, SpanMeta, DEFAULT_SKIP_SPAN};
use super::varint::{decode_varint_at, encode_varint_into, VarintBuffer};
use crate::types::DocId;
use crate::{Result, SearchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingList {
    data: VarintBuffer,
    skip_index: SkipIndex,
    skip_span: usize,
    last_doc_id: DocId,
    posting_count: usize,
}

impl Default for PostingList {
    fn default() -> Self {
        Self::new()
    }
}

impl PostingList {
    pub fn new() -> Self {
        Self::with_skip_span(DEFAULT_SKIP_SPAN)
    }

    pub fn with_skip_span(skip_span: usize) -> Self {
        assert!(skip_span > 0, "skip_span must be positive");
        Self {
            data: VarintBuffer::new(),
            skip_index: SkipIndex::new(),
            skip_span,
            last_doc_id: 0,
            posting_count: 0,
        }
    }

    /// Append a posting. Doc ids must be strictly increasing, offsets and
    /// positions non-decreasing.
    pub fn add_posting(&mut self, posting: &Posting) -> Result<()> {
        if self.posting_count > 0 && posting.doc_id <= self.last_doc_id {
            return Err(SearchError::ConstructionInvariant(format!(
                "posting doc id {} is not greater than last doc id {}",
                posting.doc_id, self.last_doc_id
            )));
        }
        posting.validate()?;

        let start_offset = u32::try_from(self.data.len()).map_err(|_| {
            SearchError::ConstructionInvariant("posting buffer exceeds 4 GiB".into())
        })?;

        let delta = if self.posting_count == 0 {
            0
        } else {
            posting.doc_id - self.last_doc_id
        };

        if self.posting_count % self.skip_span == 0 {
            let prev_doc_id = if self.posting_count == 0 {
                posting.doc_id
            } else {
                self.last_doc_id
            };
            self.skip_index.push(SpanMeta::new(prev_doc_id, start_offset));
        }

        self.data.append_bytes(&posting.encode(delta));
        self.last_doc_id = posting.doc_id;
        self.posting_count += 1;

        Ok(())
    }

    /// Iterator positioned at posting 0.
    ///
    /// # Panics
    /// If the list is empty; callers check `len() > 0` first.
    pub fn begin(&self) -> PostingListIterator<'_> {
        assert!(self.posting_count > 0, "begin() called on an empty posting list");
        PostingListIterator::new(self)
    }

    /// Number of postings (the term's document frequency)
    pub fn len(&self) -> usize {
        self.posting_count
    }

    pub fn is_empty(&self) -> bool {
        self.posting_count == 0
    }

    pub fn byte_count(&self) -> usize {
        self.data.len()
    }

    pub fn last_doc_id(&self) -> DocId {
        self.last_doc_id
    }

    pub fn skip_span(&self) -> usize {
        self.skip_span
    }

    pub fn skip_index(&self) -> &SkipIndex {
        &self.skip_index
    }

    pub(crate) fn data(&self) -> &[u8] {
        self.data.as_bytes()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let index_data = self.skip_index.serialize();
        let mut out = Vec::with_capacity(self.data.len() + index_data.len() + 20);

        encode_varint_into(self.last_doc_id, &mut out);
        encode_varint_into(self.posting_count as u32, &mut out);
        encode_varint_into(self.skip_span as u32, &mut out);
        out.extend_from_slice(&self.data.serialize());
        encode_varint_into(index_data.len() as u32, &mut out);
        out.extend_from_slice(&index_data);

        out
    }

    /// Inverse of `serialize`, reading at `offset`; returns bytes consumed
    pub fn deserialize(bytes: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cur = offset;
        let last_doc_id = decode_varint_at(bytes, &mut cur)?;
        let posting_count = decode_varint_at(bytes, &mut cur)? as usize;
        let skip_span = decode_varint_at(bytes, &mut cur)? as usize;
        if skip_span == 0 {
            return Err(SearchError::Corruption("posting list has zero skip span".into()));
        }

        let (data, consumed) = VarintBuffer::deserialize(bytes, cur)?;
        cur += consumed;

        let index_len = decode_varint_at(bytes, &mut cur)? as usize;
        let index_end = cur
            .checked_add(index_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| SearchError::Corruption("skip index overruns buffer".into()))?;
        let (skip_index, consumed) = SkipIndex::deserialize(&bytes[..index_end], cur)?;
        if consumed != index_len {
            return Err(SearchError::Corruption(format!(
                "skip index length {} does not match its {} byte region",
                consumed, index_len
            )));
        }
        cur = index_end;

        let expected_spans = posting_count.div_ceil(skip_span);
        if skip_index.len() != expected_spans {
            return Err(SearchError::Corruption(format!(
                "{} postings with span {} need {} skip entries, found {}",
                posting_count,
                skip_span,
                expected_spans,
                skip_index.len()
            )));
        }
        validate_postings(data.as_bytes(), posting_count, skip_span, &skip_index, last_doc_id)?;

        let list = Self {
            data,
            skip_index,
            skip_span,
            last_doc_id,
            posting_count,
        };
        Ok((list, cur - offset))
    }
}

/// Walk every encoded posting with checked reads so the unchecked iterator
/// can never run off the buffer or overflow a doc id.
///
/// Checks the posting count, that each posting and its offset region stay
/// inside their bounds, strictly increasing doc ids, each skip entry against
/// the posting it points at, and the stored `last_doc_id`.
fn validate_postings(
    data: &[u8],
    posting_count: usize,
    skip_span: usize,
    skip_index: &SkipIndex,
    last_doc_id: DocId,
) -> Result<()> {
    let corrupt = |msg: String| SearchError::Corruption(msg);

    let mut cur = 0usize;
    let mut doc_id: DocId = 0;

    for i in 0..posting_count {
        if cur >= data.len() {
            return Err(corrupt(format!(
                "posting data ends after {} of {} postings",
                i, posting_count
            )));
        }

        let span_meta = if i % skip_span == 0 {
            let meta = skip_index.get(i / skip_span).ok_or_else(|| {
                corrupt(format!("no skip entry for posting {}", i))
            })?;
            if meta.start_offset as usize != cur {
                return Err(corrupt(format!(
                    "skip entry {} points at byte {}, posting {} starts at {}",
                    i / skip_span,
                    meta.start_offset,
                    i,
                    cur
                )));
            }
            Some(*meta)
        } else {
            None
        };

        let content_size = decode_varint_at(data, &mut cur)? as usize;
        let next_start = cur
            .checked_add(content_size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| corrupt(format!("posting {} overruns posting data", i)))?;
        let content = &data[..next_start];

        let delta = decode_varint_at(content, &mut cur)?;
        let _term_freq = decode_varint_at(content, &mut cur)?;
        let offsets_size = decode_varint_at(content, &mut cur)? as usize;

        if i == 0 {
            let first = span_meta.map_or(0, |meta| meta.prev_doc_id);
            if delta != 0 {
                return Err(corrupt(format!("first posting has doc id delta {}", delta)));
            }
            doc_id = first;
        } else {
            if delta == 0 {
                return Err(corrupt(format!("posting {} repeats doc id {}", i, doc_id)));
            }
            if let Some(meta) = span_meta {
                if meta.prev_doc_id != doc_id {
                    return Err(corrupt(format!(
                        "skip entry {} records prev doc id {}, actual {}",
                        i / skip_span,
                        meta.prev_doc_id,
                        doc_id
                    )));
                }
            }
            doc_id = doc_id
                .checked_add(delta)
                .ok_or_else(|| corrupt(format!("posting {} doc id overflows u32", i)))?;
        }

        let offsets_end = cur
            .checked_add(offsets_size)
            .filter(|&end| end <= next_start)
            .ok_or_else(|| corrupt(format!("posting {} offset region overruns it", i)))?;

        let offsets = &data[..offsets_end];
        let mut prev_end = 0u32;
        while cur < offsets_end {
            let start = prev_end.checked_add(decode_varint_at(offsets, &mut cur)?);
            let end = start.and_then(|start| {
                decode_varint_at(offsets, &mut cur)
                    .ok()
                    .and_then(|len| start.checked_add(len))
            });
            prev_end = end.ok_or_else(|| corrupt(format!("posting {} has a bad offset pair", i)))?;
        }

        let mut prev_pos = 0u32;
        while cur < next_start {
            prev_pos = prev_pos
                .checked_add(decode_varint_at(content, &mut cur)?)
                .ok_or_else(|| corrupt(format!("posting {} position overflows u32", i)))?;
        }
    }

    if cur != data.len() {
        return Err(corrupt(format!(
            "{} bytes of posting data follow the last of {} postings",
            data.len() - cur,
            posting_count
        )));
    }

    if posting_count > 0 && doc_id != last_doc_id {
        return Err(corrupt(format!(
            "last posting has doc id {}, header says {}",
            doc_id, last_doc_id
        )));
    }

    Ok(())
}
