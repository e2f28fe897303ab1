//! Engine snapshot file
//!
//! ```text
//! magic (8) | version (u32 LE) | crc32 (u32 LE) | payload_len (u64 LE) | payload
//! ```
//! The payload is bincode. Posting lists inside it are kept in their own
//! varint serialization, so a loaded list is byte-identical to the one saved.
//!
//! Writes go to a temp file that is renamed over the target, so a reader
//! sees either the old snapshot or the new one.

use memmap2::MmapOptions;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::checksum::Checksum;
use crate::config::EngineConfig;
use crate::index::doc_lengths::DocLengthStore;
use crate::types::{DocId, Term};
use crate::{Result, SearchError};

pub const SNAPSHOT_MAGIC: [u8; 8] = *b"DSEEKSNP";
pub const SNAPSHOT_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 8 + 4 + 4 + 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    pub config: EngineConfig,
    pub next_doc_id: DocId,
    pub doc_lengths: DocLengthStore,
    /// `(term, PostingList::serialize())`
    pub postings: Vec<(Term, Vec<u8>)>,
}

/// Encode header + payload
pub fn encode_snapshot(data: &SnapshotData) -> Result<Vec<u8>> {
    let payload = bincode::serialize(data)?;
    let crc = Checksum::compute(&payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Validate header and checksum, then decode the payload
pub fn decode_snapshot(bytes: &[u8]) -> Result<SnapshotData> {
    if bytes.len() < HEADER_LEN {
        return Err(SearchError::Corruption(format!(
            "snapshot is {} bytes, header alone is {}",
            bytes.len(),
            HEADER_LEN
        )));
    }

    if bytes[0..8] != SNAPSHOT_MAGIC {
        return Err(SearchError::InvalidData("not a deltaseek snapshot".into()));
    }

    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != SNAPSHOT_VERSION {
        return Err(SearchError::InvalidData(format!(
            "unsupported snapshot version {} (expected {})",
            version, SNAPSHOT_VERSION
        )));
    }

    let crc = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[16..24]);
    let payload_len = u64::from_le_bytes(len_bytes);

    let payload = &bytes[HEADER_LEN..];
    if payload.len() as u64 != payload_len {
        return Err(SearchError::Corruption(format!(
            "snapshot payload is {} bytes, header says {}",
            payload.len(),
            payload_len
        )));
    }

    Checksum::verify(payload, crc)?;
    Ok(bincode::deserialize(payload)?)
}

/// Atomically write a snapshot; returns the file size
pub fn write_snapshot(path: &Path, data: &SnapshotData) -> Result<u64> {
    let encoded = encode_snapshot(data)?;
    let temp_path = path.with_extension("tmp");

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&encoded)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    log::debug!("Wrote {} byte snapshot to {}", encoded.len(), path.display());

    Ok(encoded.len() as u64)
}

/// Memory-map and decode a snapshot file
pub fn read_snapshot(path: &Path) -> Result<SnapshotData> {
    let file = File::open(path)?;
    // SAFETY: the file is opened read-only and snapshots are replaced by
    // rename, never modified in place, so the mapping does not change under us.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    decode_snapshot(&mmap)
}
