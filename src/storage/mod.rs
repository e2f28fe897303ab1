//! Storage layer
//!
//! Persists a built engine as a single checksummed snapshot file and maps it
//! back in on load.

pub mod checksum;
pub mod snapshot;

pub use checksum::Checksum;
pub use snapshot::{read_snapshot, write_snapshot, SnapshotData};
