
use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Maximum encoded length of a VarInt in bytes.
pub const MAX_VARINT_LEN: usize = 5;
/// Maximum encoded length of a VarLong in bytes.
pub const MAX_VARLONG_LEN: usize = 10;

const CONTINUATION_BIT: u8 = 0x80;
const SEGMENT_MASK: u8 = 0x7F;

/// Writes `v` as 1-5 bytes of 7-bit segments, least significant first, with
/// the high bit marking continuation. Negative application values travel
/// bit-cast to unsigned and therefore occupy the full five bytes.
pub fn put_varint<B: BufMut>(buf: &mut B, mut v: u32) {
    loop {
        let segment = (v as u8) & SEGMENT_MASK;
        v >>= 7;
        if v == 0 {
            buf.put_u8(segment);
            return;
        }
        buf.put_u8(segment | CONTINUATION_BIT);
    }
}

/// Writes `v` as 1-10 bytes, same scheme as [`put_varint`].
pub fn put_varlong<B: BufMut>(buf: &mut B, mut v: u64) {
    loop {
        let segment = (v as u8) & SEGMENT_MASK;
        v >>= 7;
        if v == 0 {
            buf.put_u8(segment);
            return;
        }
        buf.put_u8(segment | CONTINUATION_BIT);
    }
}

/// Reads a VarInt. Fails with [`Error::ErrVarIntOverflow`] when the fifth
/// byte carries bits that do not fit a 32-bit value (including a still-set
/// continuation bit), and [`Error::ErrReadPastEnd`] on exhausted input.
pub fn get_varint<B: Buf>(buf: &mut B) -> Result<u32> {
    let mut v = 0u32;
    let mut i = 0;
    loop {
        if !buf.has_remaining() {
            return Err(Error::ErrReadPastEnd);
        }
        let b = buf.get_u8();
        if i == MAX_VARINT_LEN - 1 && b & 0xF0 != 0 {
            return Err(Error::ErrVarIntOverflow);
        }
        v |= u32::from(b & SEGMENT_MASK) << (7 * i);
        if b & CONTINUATION_BIT == 0 {
            return Ok(v);
        }
        i += 1;
    }
}

/// Reads a VarLong. The tenth byte may only carry its lowest bit.
pub fn get_varlong<B: Buf>(buf: &mut B) -> Result<u64> {
    let mut v = 0u64;
    let mut i = 0;
    loop {
        if !buf.has_remaining() {
            return Err(Error::ErrReadPastEnd);
        }
        let b = buf.get_u8();
        if i == MAX_VARLONG_LEN - 1 && b & 0xFE != 0 {
            return Err(Error::ErrVarLongOverflow);
        }
        v |= u64::from(b & SEGMENT_MASK) << (7 * i);
        if b & CONTINUATION_BIT == 0 {
            return Ok(v);
        }
        i += 1;
    }
}

/// Encoded length of `v` as a VarInt, in bytes.
pub fn varint_size(v: u32) -> usize {
    let mut n = 1;
    let mut v = v >> 7;
    while v != 0 {
        n += 1;
        v >>= 7;
    }
    n
}

/// Encoded length of `v` as a VarLong, in bytes.
pub fn varlong_size(v: u64) -> usize {
    let mut n = 1;
    let mut v = v >> 7;
    while v != 0 {
        n += 1;
        v >>= 7;
    }
    n
}
