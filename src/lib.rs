//! deltaseek - inverted-index search core
//!
//! Per-term posting lists stored as delta/varint-encoded byte buffers with a
//! sparse skip index, queried document-at-a-time with BM25 top-k ranking and
//! optional phrase matching.
//!
//! ## Architecture
//! - Index layer: varint codec, posting lists + skip index, iterators,
//!   doc length store, analyzer, term -> posting list map
//! - Query layer: DAAT intersection (1/2/N-term), phrase matching, BM25,
//!   bounded min-heap ranking
//! - Storage layer: checksummed snapshot files (mmap on load)
//! - Engine: build-then-serve facade with result cache and batch search
//!
//! ```ignore
//! use deltaseek::{EngineConfig, SearchEngine, SearchQuery};
//!
//! let mut engine = SearchEngine::new(EngineConfig::default())?;
//! engine.add_document("my hello world program")?;
//! let result = engine.search(&SearchQuery::new(["hello", "world"]).phrase())?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod index;
pub mod query;
pub mod storage;
pub mod types;

mod error;

pub use config::EngineConfig;
pub use engine::{EngineStats, SearchEngine, SearchQuery, SearchResult, SearchResultEntry};
pub use error::{Result, SearchError};
pub use index::{DocLengthStore, InvertedIndex, Posting, PostingList, PostingListIterator};
pub use query::{QueryProcessor, ResultEntry};
pub use types::{DocId, DocInfo, OffsetPair, OffsetPairs, Position, Positions, Term};
