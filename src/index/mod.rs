//! Index layer
//!
//! Everything built at ingestion time and read at query time:
//! - `varint`: varint codec and the posting buffer
//! - `posting` / `skip_index` / `posting_list`: delta-encoded posting lists
//! - `iterator`: posting list cursor with skip-index seeking
//! - `doc_lengths`: field lengths for BM25
//! - `analyzer` / `inverted_index`: text to term -> posting list map

pub mod analyzer;
pub mod doc_lengths;
pub mod inverted_index;
pub mod iterator;
pub mod posting;
pub mod posting_list;
pub mod skip_index;
pub mod varint;

pub use analyzer::{Analyzer, Token, Tokenizer, WhitespaceTokenizer};
pub use doc_lengths::DocLengthStore;
pub use inverted_index::InvertedIndex;
pub use iterator::{
    CompressedPairIterator, CompressedPositionIterator, PopIterator, PostingListIterator,
    VecPopIterator,
};
pub use posting::Posting;
pub use posting_list::PostingList;
pub use skip_index::{SkipIndex, SpanMeta, DEFAULT_SKIP_SPAN};
pub use varint::{VarintBuffer, VarintIterator, VarintIteratorEndBound};
