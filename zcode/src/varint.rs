//! Unsigned LEB128 varints.
//!
//! Least-significant 7-bit group first, MSB set on every byte except the
//! last. At most ten bytes encode a `u64`; the tenth may only carry the
//! single remaining bit.

use crate::{Error, Result};

/// Maximum encoded size of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` to `dst` and return the number of bytes written.
pub fn append_uvarint(dst: &mut Vec<u8>, mut value: u64) -> usize {
    let mut n = 1;
    while value >= 0x80 {
        dst.push((value as u8) | 0x80);
        value >>= 7;
        n += 1;
    }
    dst.push(value as u8);
    n
}

/// Decode a varint from the front of `buf`, returning the value and the
/// number of bytes consumed.
pub fn uvarint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN || (i == MAX_VARINT_LEN - 1 && byte > 1) {
            return Err(Error::MalformedTag { offset: 0 });
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(Error::MalformedTag { offset: 0 })
}

/// Decode a varint from the front of `buf` and advance the slice past it.
pub fn read_uvarint(buf: &mut &[u8]) -> Result<u64> {
    let (value, n) = uvarint(buf)?;
    *buf = &buf[n..];
    Ok(value)
}

/// Number of bytes [`append_uvarint`] writes for `value`.
pub fn size_of_uvarint(mut value: u64) -> usize {
    let mut n = 1;
    while value >= 0x80 {
        value >>= 7;
        n += 1;
    }
    n
}
