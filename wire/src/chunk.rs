#[cfg(test)]
mod chunk_test;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use xxhash_rust::xxh3::xxh3_64;

use codec::data_type::DataType;

use crate::error::{Error, Result};
use crate::snowflake::{Snowflake, SNOWFLAKE_SIZE};

/// Four ASCII bytes "GRRR", tag-prefixed at the start of every chunk
/// datagram.
pub const CHUNK_MAGIC: u32 = 0x4752_5252;

/// Size of an entire wire chunk, header included.
pub const MAX_CHUNK_SIZE: usize = 1024;
/// Tagged magic (5) + tagged length (3) + tagged snowflake (17) + tagged
/// hash (9) + tagged index (5) + tagged count (5).
pub const CHUNK_HEADER_SIZE: usize = 44;
/// Body bytes a single chunk may carry.
pub const MAX_CHUNK_BODY_SIZE: usize = MAX_CHUNK_SIZE - CHUNK_HEADER_SIZE;

/// Returns true if `b` looks like a chunk datagram. Useful for
/// multiplexing; does not guarantee that unmarshalling will succeed.
pub fn is_chunk(b: &[u8]) -> bool {
    b.len() > 4
        && b[0] == DataType::Magic.id()
        && u32::from_be_bytes([b[1], b[2], b[3], b[4]]) == CHUNK_MAGIC
}

/// A transport-layer fragment of one packed packet.
///
/// ```text
/// [0xFF][magic u32=0x47525252][0x03][length u16]
/// [0xFE][snowflake 16B][0xFE][hash u64]
/// [0x04][index u32][0x04][count u32]
/// [body `length` B]
/// ```
///
/// The hash is XXH3-64 over this chunk's body bytes alone; every chunk is
/// independently integrity-checked before reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub snowflake: Snowflake,
    pub hash: u64,
    pub index: u32,
    pub count: u32,
    pub body: Bytes,
}

/// Splits a packed packet into chunks of at most [`MAX_CHUNK_BODY_SIZE`]
/// body bytes. Every chunk shares `snowflake` and the total count; bodies
/// concatenated in index order reproduce `packed` exactly.
pub fn chunkify(snowflake: Snowflake, packed: Bytes) -> Vec<Chunk> {
    let count = ((packed.len() + MAX_CHUNK_BODY_SIZE - 1) / MAX_CHUNK_BODY_SIZE).max(1);
    let mut chunks = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * MAX_CHUNK_BODY_SIZE;
        let end = (start + MAX_CHUNK_BODY_SIZE).min(packed.len());
        let body = packed.slice(start..end);
        chunks.push(Chunk {
            snowflake,
            hash: xxh3_64(&body),
            index: i as u32,
            count: count as u32,
            body,
        });
    }
    chunks
}

impl Chunk {
    pub fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CHUNK_HEADER_SIZE + self.body.len());
        buf.put_u8(DataType::Magic.id());
        buf.put_u32(CHUNK_MAGIC);
        buf.put_u8(DataType::Short.id());
        buf.put_u16(self.body.len() as u16);
        buf.put_u8(DataType::FixedBytes.id());
        buf.put_slice(self.snowflake.as_bytes());
        buf.put_u8(DataType::FixedBytes.id());
        buf.put_u64(self.hash);
        buf.put_u8(DataType::Integer.id());
        buf.put_u32(self.index);
        buf.put_u8(DataType::Integer.id());
        buf.put_u32(self.count);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Parses and integrity-checks one chunk datagram.
    pub fn unmarshal(raw: &Bytes) -> Result<Chunk> {
        let mut buf = raw.clone();
        if buf.remaining() < CHUNK_HEADER_SIZE {
            return Err(Error::ErrMalformedChunk);
        }

        if buf.get_u8() != DataType::Magic.id() || buf.get_u32() != CHUNK_MAGIC {
            return Err(Error::ErrInvalidChunkMagic);
        }

        if buf.get_u8() != DataType::Short.id() {
            return Err(Error::ErrMalformedChunk);
        }
        let length = buf.get_u16() as usize;
        if length > MAX_CHUNK_BODY_SIZE {
            return Err(Error::ErrChunkLengthExceedsMax {
                length,
                max: MAX_CHUNK_BODY_SIZE,
            });
        }

        if buf.get_u8() != DataType::FixedBytes.id() {
            return Err(Error::ErrMalformedChunk);
        }
        let mut raw_snowflake = [0u8; SNOWFLAKE_SIZE];
        buf.copy_to_slice(&mut raw_snowflake);
        let snowflake = Snowflake::from_bytes(raw_snowflake);

        if buf.get_u8() != DataType::FixedBytes.id() {
            return Err(Error::ErrMalformedChunk);
        }
        let hash = buf.get_u64();

        if buf.get_u8() != DataType::Integer.id() {
            return Err(Error::ErrMalformedChunk);
        }
        let index = buf.get_u32();

        if buf.get_u8() != DataType::Integer.id() {
            return Err(Error::ErrMalformedChunk);
        }
        let count = buf.get_u32();

        let body = buf.copy_to_bytes(buf.remaining());
        if body.len() != length {
            return Err(Error::ErrChunkLengthMismatch {
                snowflake,
                declared: length,
                actual: body.len(),
            });
        }
        if count == 0 || index >= count {
            return Err(Error::ErrChunkIndexOutOfRange {
                snowflake,
                index,
                count,
            });
        }
        if xxh3_64(&body) != hash {
            return Err(Error::ErrChunkHashMismatch { snowflake });
        }

        Ok(Chunk {
            snowflake,
            hash,
            index,
            count,
            body,
        })
    }
}
