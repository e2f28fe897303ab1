//! Posting List Iterator
//!
//! A read-only cursor over one `PostingList`. Only the current posting's
//! header (doc id delta, term frequency, region sizes) is decoded; offsets and
//! positions stay encoded until a caller asks for a sub-iterator.
//!
//! Seeking uses the skip index: at a span boundary, if the next span's
//! `prev_doc_id` is still below the target, the whole span is jumped over in
//! O(1) instead of decoding its postings one by one.

use super::posting::Posting;
use super::posting_list::PostingList;
use super::skip_index::SkipIndex;
use super::varint::read_varint;
use crate::types::{DocId, OffsetPair, Position};

/// Closed set of pop-style iterators consumed by phrase matching and
/// highlighting. Callers must check `is_end()` before `pop()`.
pub trait PopIterator {
    type Item;

    fn is_end(&self) -> bool;

    fn pop(&mut self) -> Self::Item;
}

/// Decoded header of the current posting
#[derive(Debug, Clone, Copy, Default)]
struct PostingCache {
    doc_id: DocId,
    term_freq: u32,
    offsets_start: usize,
    /// Also where the positions region begins
    offsets_end: usize,
    next_posting_start: usize,
}

#[derive(Debug, Clone)]
pub struct PostingListIterator<'a> {
    data: &'a [u8],
    skip_index: &'a SkipIndex,
    skip_span: usize,
    posting_count: usize,
    posting_index: usize,
    /// Doc id of the posting before the current one (undoes the delta)
    prev_doc_id: DocId,
    cache: PostingCache,
}

impl<'a> PostingListIterator<'a> {
    pub(crate) fn new(list: &'a PostingList) -> Self {
        let mut it = Self {
            data: list.data(),
            skip_index: list.skip_index(),
            skip_span: list.skip_span(),
            posting_count: list.len(),
            posting_index: 0,
            prev_doc_id: 0,
            cache: PostingCache::default(),
        };

        if let Some(first) = list.skip_index().get(0) {
            it.prev_doc_id = first.prev_doc_id;
            it.decode_at(first.start_offset as usize);
        }

        it
    }

    fn decode_at(&mut self, offset: usize) {
        let mut cur = offset;

        let (content_size, len) = read_varint(self.data, cur);
        cur += len;
        let next_posting_start = cur + content_size as usize;

        let (delta, len) = read_varint(self.data, cur);
        cur += len;
        let (term_freq, len) = read_varint(self.data, cur);
        cur += len;
        let (offsets_size, len) = read_varint(self.data, cur);
        cur += len;

        self.cache = PostingCache {
            doc_id: self.prev_doc_id + delta,
            term_freq,
            offsets_start: cur,
            offsets_end: cur + offsets_size as usize,
            next_posting_start,
        };
    }

    pub fn is_end(&self) -> bool {
        self.posting_index >= self.posting_count
    }

    /// Document frequency of the underlying term
    pub fn size(&self) -> usize {
        self.posting_count
    }

    pub fn posting_index(&self) -> usize {
        self.posting_index
    }

    /// # Panics
    /// If the iterator is at the end.
    #[inline]
    pub fn doc_id(&self) -> DocId {
        assert!(!self.is_end(), "doc_id() on an ended posting list iterator");
        self.cache.doc_id
    }

    /// # Panics
    /// If the iterator is at the end.
    #[inline]
    pub fn term_freq(&self) -> u32 {
        assert!(!self.is_end(), "term_freq() on an ended posting list iterator");
        self.cache.term_freq
    }

    /// Move to the next posting
    pub fn advance(&mut self) {
        if self.is_end() {
            return;
        }

        self.posting_index += 1;
        if self.is_end() {
            return;
        }

        self.prev_doc_id = self.cache.doc_id;
        self.decode_at(self.cache.next_posting_start);
    }

    /// At a span boundary with another span after the current one
    pub fn has_skip(&self) -> bool {
        self.posting_index % self.skip_span == 0
            && self.posting_index / self.skip_span + 1 < self.skip_index.len()
    }

    /// Jump to the first posting of the next span without decoding the
    /// postings in between. Requires `has_skip()`.
    pub fn skip_to_next_span(&mut self) {
        debug_assert!(self.has_skip());
        let next_span = self.posting_index / self.skip_span + 1;
        let Some(meta) = self.skip_index.get(next_span) else {
            return;
        };

        self.posting_index = next_span * self.skip_span;
        self.prev_doc_id = meta.prev_doc_id;
        self.decode_at(meta.start_offset as usize);
    }

    fn next_span_prev_doc_id(&self) -> Option<DocId> {
        self.skip_index
            .get(self.posting_index / self.skip_span + 1)
            .map(|meta| meta.prev_doc_id)
    }

    /// Move forward to the first posting with doc id >= `target`, or to the
    /// end. Never moves backwards.
    pub fn skip_forward(&mut self, target: DocId) {
        while !self.is_end() && self.cache.doc_id < target {
            if self.has_skip() && self.next_span_prev_doc_id().is_some_and(|prev| prev < target) {
                self.skip_to_next_span();
            } else {
                self.advance();
            }
        }
    }

    /// Lazy iterator over the current posting's offset pairs
    pub fn offset_pairs_begin(&self) -> CompressedPairIterator<'a> {
        assert!(!self.is_end(), "offset_pairs_begin() on an ended posting list iterator");
        CompressedPairIterator::new(self.data, self.cache.offsets_start, self.cache.offsets_end)
    }

    /// Lazy iterator over the current posting's positions
    pub fn position_begin(&self) -> CompressedPositionIterator<'a> {
        assert!(!self.is_end(), "position_begin() on an ended posting list iterator");
        CompressedPositionIterator::new(
            self.data,
            self.cache.offsets_end,
            self.cache.next_posting_start,
        )
    }

    /// Fully decode the current posting
    pub fn posting(&self) -> Posting {
        Posting::with_positions(
            self.doc_id(),
            self.term_freq(),
            self.offset_pairs_begin().collect(),
            self.position_begin().collect(),
        )
    }
}

/// Offset pairs of one posting, decoded on demand
#[derive(Debug, Clone)]
pub struct CompressedPairIterator<'a> {
    data: &'a [u8],
    cur: usize,
    end: usize,
    prev_end: u32,
}

impl<'a> CompressedPairIterator<'a> {
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            cur: start,
            end,
            prev_end: 0,
        }
    }
}

impl PopIterator for CompressedPairIterator<'_> {
    type Item = OffsetPair;

    fn is_end(&self) -> bool {
        self.cur >= self.end
    }

    fn pop(&mut self) -> OffsetPair {
        assert!(!self.is_end(), "pop() on an exhausted offset iterator");
        let region = &self.data[..self.end];

        let (start_delta, len) = read_varint(region, self.cur);
        self.cur += len;
        let (end_delta, len) = read_varint(region, self.cur);
        self.cur += len;

        let start = self.prev_end + start_delta;
        let end = start + end_delta;
        self.prev_end = end;
        (start, end)
    }
}

impl Iterator for CompressedPairIterator<'_> {
    type Item = OffsetPair;

    fn next(&mut self) -> Option<OffsetPair> {
        if self.is_end() {
            None
        } else {
            Some(self.pop())
        }
    }
}

/// Positions of one posting, decoded on demand
#[derive(Debug, Clone)]
pub struct CompressedPositionIterator<'a> {
    data: &'a [u8],
    cur: usize,
    end: usize,
    prev: Position,
}

impl<'a> CompressedPositionIterator<'a> {
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            cur: start,
            end,
            prev: 0,
        }
    }
}

impl PopIterator for CompressedPositionIterator<'_> {
    type Item = Position;

    fn is_end(&self) -> bool {
        self.cur >= self.end
    }

    fn pop(&mut self) -> Position {
        assert!(!self.is_end(), "pop() on an exhausted position iterator");
        let (delta, len) = read_varint(&self.data[..self.end], self.cur);
        self.cur += len;
        self.prev += delta;
        self.prev
    }
}

impl Iterator for CompressedPositionIterator<'_> {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.is_end() {
            None
        } else {
            Some(self.pop())
        }
    }
}

/// Vector-backed counterpart of the compressed iterators
#[derive(Debug, Clone)]
pub struct VecPopIterator<T> {
    values: Vec<T>,
    index: usize,
}

impl<T: Copy> VecPopIterator<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values, index: 0 }
    }
}

impl<T: Copy> PopIterator for VecPopIterator<T> {
    type Item = T;

    fn is_end(&self) -> bool {
        self.index >= self.values.len()
    }

    fn pop(&mut self) -> T {
        assert!(!self.is_end(), "pop() on an exhausted vector iterator");
        let value = self.values[self.index];
        self.index += 1;
        value
    }
}
