//! CRC32 integrity checks for snapshot payloads
//!
//! ```ignore
//! use deltaseek::storage::checksum::Checksum;
//!
//! let crc = Checksum::compute(payload);
//! Checksum::verify(payload, crc)?;
//! ```

use crc32fast::Hasher;

use crate::{Result, SearchError};

pub struct Checksum;

impl Checksum {
    pub fn compute(data: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    pub fn verify(data: &[u8], expected: u32) -> Result<()> {
        let actual = Self::compute(data);
        if actual != expected {
            return Err(SearchError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }
}
