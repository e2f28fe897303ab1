//! Query execution layer
//!
//! - `processor`: DAAT intersection and top-k ranking
//! - `phrase`: phrase verification on candidate documents
//! - `scoring`: BM25
//! - `result`: ranked entries with lazy highlight offsets

pub mod phrase;
pub mod processor;
pub mod result;
pub mod scoring;

pub use phrase::{PhraseQueryProcessor, PositionInfo, PositionTable};
pub use processor::QueryProcessor;
pub use result::ResultEntry;
pub use scoring::{Bm25Similarity, BM25_B, BM25_K1};
