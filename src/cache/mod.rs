//! Cache module - LRU cache for finished query results

pub mod result_cache;

pub use result_cache::{CacheStats, ResultCache};
