//! Varint Codec and Posting Buffer
//!
//! Little-endian base-128 varints:
//! - Each byte: [continuation_bit:1][data:7]
//! - If continuation_bit=1, more bytes follow
//! - A u32 takes 1-5 bytes
//!
//! Two decoders are provided:
//! - `read_varint` for buffers built by this crate (a read past the slice end
//!   panics through the slice bounds check, it never returns garbage)
//! - `decode_varint` for bytes that came from outside the process
//!   (snapshot files), which reports malformed input as an error

use crate::{Result, SearchError};

/// Longest encoding of a u32
pub const MAX_VARINT_LEN: usize = 5;

/// Append the varint encoding of `value` to `out`, returning the byte count
#[inline]
pub fn encode_varint_into(mut value: u32, out: &mut Vec<u8>) -> usize {
    let start = out.len();

    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }

        out.push(byte);

        if value == 0 {
            break;
        }
    }

    out.len() - start
}

/// Encode a u32 as a standalone varint
pub fn encode_varint(value: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAX_VARINT_LEN);
    encode_varint_into(value, &mut bytes);
    bytes
}

/// Number of bytes `value` occupies once encoded
#[inline]
pub fn varint_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

/// Decode a varint from a buffer built by this crate.
///
/// Returns: (decoded_value, bytes_consumed)
#[inline]
pub fn read_varint(buf: &[u8], offset: usize) -> (u32, usize) {
    let mut value = 0u32;
    let mut shift = 0;
    let mut pos = offset;

    loop {
        let byte = buf[pos];
        pos += 1;

        value |= ((byte & 0x7F) as u32) << shift;

        if (byte & 0x80) == 0 {
            break;
        }
        shift += 7;
    }

    (value, pos - offset)
}

/// Decode a varint from untrusted bytes
///
/// Returns: (decoded_value, bytes_consumed)
pub fn decode_varint(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut value = 0u64;
    let mut shift = 0;
    let mut pos = 0;

    loop {
        if pos >= bytes.len() {
            return Err(SearchError::InvalidData("Incomplete varint".into()));
        }
        if pos >= MAX_VARINT_LEN {
            return Err(SearchError::InvalidData("Varint overflow".into()));
        }

        let byte = bytes[pos];
        pos += 1;

        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if (byte & 0x80) == 0 {
            break;
        }
    }

    let value = u32::try_from(value)
        .map_err(|_| SearchError::InvalidData(format!("Varint {} exceeds u32", value)))?;

    Ok((value, pos))
}

/// Checked decode at `offset`, advancing it past the varint
pub fn decode_varint_at(bytes: &[u8], offset: &mut usize) -> Result<u32> {
    let rest = bytes.get(*offset..).ok_or_else(|| {
        SearchError::InvalidData(format!("Offset {} past end of {} bytes", offset, bytes.len()))
    })?;
    let (value, consumed) = decode_varint(rest)?;
    *offset += consumed;
    Ok(value)
}

/// Append-only byte buffer of varints (the Posting Buffer)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarintBuffer {
    data: Vec<u8>,
}

impl VarintBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn append(&mut self, value: u32) -> usize {
        encode_varint_into(value, &mut self.data)
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Insert `value` before the current contents (used for size prefixes)
    pub fn prepend(&mut self, value: u32) -> usize {
        let prefix = encode_varint(value);
        self.data.splice(0..0, prefix.iter().copied());
        prefix.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// `byte_len | data`
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + MAX_VARINT_LEN);
        encode_varint_into(self.data.len() as u32, &mut out);
        out.extend_from_slice(&self.data);
        out
    }

    /// Inverse of `serialize`, reading at `offset`; returns bytes consumed
    pub fn deserialize(bytes: &[u8], offset: usize) -> Result<(Self, usize)> {
        let mut cur = offset;
        let len = decode_varint_at(bytes, &mut cur)? as usize;
        let end = cur.checked_add(len).filter(|&end| end <= bytes.len()).ok_or_else(|| {
            SearchError::Corruption(format!(
                "Varint buffer of {} bytes at offset {} overruns {} bytes",
                len,
                cur,
                bytes.len()
            ))
        })?;

        let buf = Self {
            data: bytes[cur..end].to_vec(),
        };
        Ok((buf, end - offset))
    }
}

impl From<Vec<u8>> for VarintBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Decodes exactly `count` varints starting at `start`
#[derive(Debug, Clone)]
pub struct VarintIterator<'a> {
    data: &'a [u8],
    cur: usize,
    index: usize,
    count: usize,
}

impl<'a> VarintIterator<'a> {
    pub fn new(data: &'a [u8], start: usize, count: usize) -> Self {
        Self {
            data,
            cur: start,
            index: 0,
            count,
        }
    }

    pub fn over(buf: &'a VarintBuffer, count: usize) -> Self {
        Self::new(buf.as_bytes(), 0, count)
    }

    pub fn is_end(&self) -> bool {
        self.index == self.count
    }

    /// Must check `is_end()` before calling
    pub fn pop(&mut self) -> u32 {
        assert!(!self.is_end(), "pop() on an exhausted varint iterator");
        let (value, len) = read_varint(self.data, self.cur);
        self.cur += len;
        self.index += 1;
        value
    }
}

/// Decodes varints in the byte range `[start, end)`
#[derive(Debug, Clone)]
pub struct VarintIteratorEndBound<'a> {
    data: &'a [u8],
    cur: usize,
    end: usize,
}

impl<'a> VarintIteratorEndBound<'a> {
    pub fn new(data: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            data,
            cur: start,
            end,
        }
    }

    pub fn over(buf: &'a VarintBuffer) -> Self {
        Self::new(buf.as_bytes(), 0, buf.len())
    }

    pub fn is_end(&self) -> bool {
        self.cur >= self.end
    }

    /// Must check `is_end()` before calling
    pub fn pop(&mut self) -> u32 {
        assert!(!self.is_end(), "pop() past the end bound");
        let (value, len) = read_varint(&self.data[..self.end], self.cur);
        self.cur += len;
        value
    }
}
