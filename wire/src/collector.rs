
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::trace;

use codec::data_type::DataType;
use codec::varint;

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::packet::{IncomingPacket, PACKET_MAGIC};
use crate::snowflake::Snowflake;

/// How long a partially reassembled packet may wait for its remaining
/// chunks before being evicted.
pub const REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on the chunk count a single snowflake may declare, so a
/// forged count cannot reserve gigabytes of slots.
pub const MAX_CHUNK_COUNT: u32 = 1 << 16;

struct PendingPacket {
    sender: SocketAddr,
    count: u32,
    slots: Vec<Option<Bytes>>,
    remaining: usize,
    deadline: Instant,
}

/// Buffers incoming chunks by snowflake and reassembles packets once every
/// index is present.
///
/// Chunks sharing a snowflake must agree on sender and count; the stored
/// sender is never overwritten. Re-delivery of an index replaces the stored
/// body without affecting completion accounting.
pub struct ChunkCollector {
    pending: HashMap<Snowflake, PendingPacket>,
    timeout: Duration,
}

impl Default for ChunkCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkCollector {
    pub fn new() -> Self {
        Self::with_timeout(REASSEMBLY_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        ChunkCollector {
            pending: HashMap::new(),
            timeout,
        }
    }

    /// Number of packets currently awaiting chunks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discards every pending reassembly.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Feeds one validated chunk in. Returns the reassembled packet when
    /// this chunk completes its snowflake's set, `None` while chunks are
    /// still outstanding.
    pub fn add_chunk(
        &mut self,
        sender: SocketAddr,
        chunk: Chunk,
    ) -> Result<Option<IncomingPacket>> {
        let snowflake = chunk.snowflake;
        if chunk.count == 0 || chunk.index >= chunk.count {
            return Err(Error::ErrChunkIndexOutOfRange {
                snowflake,
                index: chunk.index,
                count: chunk.count,
            });
        }
        if chunk.count > MAX_CHUNK_COUNT {
            return Err(Error::ErrChunkCountTooLarge {
                snowflake,
                count: chunk.count,
            });
        }

        let entry = match self.pending.entry(snowflake) {
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.sender != sender {
                    return Err(Error::ErrSenderMismatch { snowflake });
                }
                if entry.count != chunk.count {
                    return Err(Error::ErrCountMismatch { snowflake });
                }
                entry
            }
            Entry::Vacant(vacant) => {
                trace!(
                    "started reassembly of {snowflake}: {} chunks expected from {sender}",
                    chunk.count
                );
                vacant.insert(PendingPacket {
                    sender,
                    count: chunk.count,
                    slots: vec![None; chunk.count as usize],
                    remaining: chunk.count as usize,
                    deadline: Instant::now() + self.timeout,
                })
            }
        };

        if entry.slots[chunk.index as usize].replace(chunk.body).is_none() {
            entry.remaining -= 1;
        }
        if entry.remaining > 0 {
            return Ok(None);
        }

        let entry = match self.pending.remove(&snowflake) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        trace!("reassembly of {snowflake} complete");
        Self::assemble(snowflake, entry).map(Some)
    }

    /// Verifies the packet preamble over the concatenated chunk bodies and
    /// parses out the packet.
    fn assemble(snowflake: Snowflake, entry: PendingPacket) -> Result<IncomingPacket> {
        let total: usize = entry
            .slots
            .iter()
            .map(|slot| slot.as_ref().map_or(0, |body| body.len()))
            .sum();
        let mut assembled = BytesMut::with_capacity(total);
        for body in entry.slots.into_iter().flatten() {
            assembled.put_slice(&body);
        }
        let mut buf = assembled.freeze();

        if buf.remaining() < 5
            || buf.get_u8() != DataType::Magic.id()
            || buf.get_u32() != PACKET_MAGIC
        {
            return Err(Error::ErrInvalidPacketMagic { snowflake });
        }
        if !buf.has_remaining() || buf.get_u8() != DataType::VarInt.id() {
            return Err(Error::ErrBadPacketLength { snowflake });
        }
        let declared = varint::get_varint(&mut buf)
            .map_err(|_| Error::ErrBadPacketLength { snowflake })? as usize;
        if declared != buf.remaining() {
            return Err(Error::ErrPacketLengthMismatch {
                snowflake,
                declared,
                actual: buf.remaining(),
            });
        }

        IncomingPacket::parse(entry.sender, buf).map_err(|e| e.into_body_parse(snowflake))
    }

    /// Evicts reassemblies whose deadline has passed, reporting the sender
    /// and snowflake of each so the caller can emit timeout rejections.
    pub fn prune(&mut self) -> Vec<(SocketAddr, Snowflake)> {
        let now = Instant::now();
        let expired: Vec<Snowflake> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(snowflake, _)| *snowflake)
            .collect();

        expired
            .into_iter()
            .filter_map(|snowflake| {
                self.pending.remove(&snowflake).map(|entry| {
                    trace!("reassembly of {snowflake} timed out");
                    (entry.sender, snowflake)
                })
            })
            .collect()
    }
}
