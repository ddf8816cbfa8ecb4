//! Fixed-width big-endian primitive codecs over the code segment.
//!
//! Every multi-byte integer that appears in the bytecode stream is big-endian
//! two's complement. This module is the single place that knows that; nothing
//! above it reaches into raw byte slices directly.

use crate::consts::VALUE_SIZE;
use crate::error::Fault;

/// Reads a big-endian `u16` at `offset`, failing if it would run past `code`.
pub fn read_u16(code: &[u8], offset: usize) -> Result<u16, Fault> {
    let bytes = code
        .get(offset..offset + 2)
        .ok_or(Fault::CodeUnderflow)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Reads a big-endian `i32` at `offset` (used for code addresses and data cell indices).
pub fn read_i32(code: &[u8], offset: usize) -> Result<i32, Fault> {
    let bytes = code
        .get(offset..offset + 4)
        .ok_or(Fault::CodeUnderflow)?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads a big-endian `u32` at `offset`.
pub fn read_u32(code: &[u8], offset: usize) -> Result<u32, Fault> {
    read_i32(code, offset).map(|v| v as u32)
}

/// Reads a big-endian `i64` at `offset` (used for `VALUE` immediates).
pub fn read_i64(code: &[u8], offset: usize) -> Result<i64, Fault> {
    let bytes = code
        .get(offset..offset + 8)
        .ok_or(Fault::CodeUnderflow)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(i64::from_be_bytes(buf))
}

/// Reads a signed 8-bit branch offset at `offset`.
pub fn read_i8(code: &[u8], offset: usize) -> Result<i8, Fault> {
    code.get(offset).copied().map(|b| b as i8).ok_or(Fault::CodeUnderflow)
}

/// Writes a big-endian `u16` at `offset`. Used by the encoder, never by the executor.
pub fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Writes a big-endian `i32`/`u32` at the end of `buf`.
pub fn write_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Writes a big-endian `i64` at the end of `buf`.
pub fn write_i64(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Writes a signed 8-bit offset at the end of `buf`.
pub fn write_i8(buf: &mut Vec<u8>, value: i8) {
    buf.push(value as u8);
}

/// Translates a data-segment cell index (as decoded from the code stream) into
/// a byte offset, validating that `offset + VALUE_SIZE` lies strictly within
/// `data_len` bytes.
///
/// Negative cell indices and indices whose byte offset would overflow are
/// rejected as [`Fault::InvalidAddress`].
pub fn cell_to_checked_offset(cell_index: i32, data_len: usize) -> Result<usize, Fault> {
    if cell_index < 0 {
        return Err(Fault::InvalidAddress);
    }
    let offset = (cell_index as u64)
        .checked_mul(VALUE_SIZE as u64)
        .ok_or(Fault::InvalidAddress)?;
    let end = offset.checked_add(VALUE_SIZE as u64).ok_or(Fault::InvalidAddress)?;
    if end > data_len as u64 {
        return Err(Fault::InvalidAddress);
    }
    Ok(offset as usize)
}

/// A packed timestamp: high 32 bits are the block height, low 32 bits are the
/// transaction sequence number within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Packs a (block height, sequence) pair into a single 64-bit value.
    pub const fn pack(block_height: u32, sequence: u32) -> Self {
        Self(((block_height as u64) << 32) | sequence as u64)
    }

    /// The block height component.
    pub const fn block_height(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The transaction sequence component.
    pub const fn sequence(self) -> u32 {
        self.0 as u32
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_through_pack_and_unpack() {
        let ts = Timestamp::pack(123_456, 7);
        assert_eq!(ts.block_height(), 123_456);
        assert_eq!(ts.sequence(), 7);
    }

    #[test]
    fn cell_to_offset_rejects_negative_and_out_of_bounds() {
        assert!(cell_to_checked_offset(-1, 64).is_err());
        assert_eq!(cell_to_checked_offset(0, 64).unwrap(), 0);
        assert_eq!(cell_to_checked_offset(7, 64).unwrap(), 56);
        assert!(cell_to_checked_offset(8, 64).is_err());
    }

    #[test]
    fn read_i64_fails_on_short_buffer() {
        let buf = [0u8; 4];
        assert!(matches!(read_i64(&buf, 0), Err(Fault::CodeUnderflow)));
    }
}
