#[cfg(test)]
mod packet_test;

use std::net::SocketAddr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use codec::data_type::DataType;
use codec::varint;
use codec::{FieldReader, FieldWriter};

use crate::chunk::{self, Chunk};
use crate::error::{Error, Result};
use crate::snowflake::{Snowflake, SNOWFLAKE_SIZE};

/// Four ASCII bytes "MUST", tag-prefixed at the start of every packed
/// packet.
pub const PACKET_MAGIC: u32 = 0x4D55_5354;

/// An application packet under construction. The body is built through the
/// embedded [`FieldWriter`]; a fresh snowflake is generated per packet.
#[derive(Debug)]
pub struct OutgoingPacket {
    id: u32,
    snowflake: Snowflake,
    writer: FieldWriter,
}

impl OutgoingPacket {
    pub fn new(id: u32) -> Self {
        OutgoingPacket {
            id,
            snowflake: Snowflake::new(),
            writer: FieldWriter::new(),
        }
    }

    /// A packet with a caller-supplied snowflake, for deterministic tests
    /// and retransmission-style callers that must reuse an identifier.
    pub fn with_snowflake(id: u32, snowflake: Snowflake) -> Self {
        OutgoingPacket {
            id,
            snowflake,
            writer: FieldWriter::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn snowflake(&self) -> Snowflake {
        self.snowflake
    }

    pub fn writer(&mut self) -> &mut FieldWriter {
        &mut self.writer
    }

    /// Serializes the whole packet: tagged magic, tagged length varint,
    /// tagged snowflake, tagged id varint, then the self-describing body.
    /// The length counts every byte after the length varint.
    pub fn pack(&self) -> Bytes {
        let body = self.writer.as_slice();
        let length = 1 + SNOWFLAKE_SIZE + 1 + varint::varint_size(self.id) + body.len();
        let mut buf =
            BytesMut::with_capacity(1 + 4 + 1 + varint::varint_size(length as u32) + length);

        buf.put_u8(DataType::Magic.id());
        buf.put_u32(PACKET_MAGIC);
        buf.put_u8(DataType::VarInt.id());
        varint::put_varint(&mut buf, length as u32);
        buf.put_u8(DataType::FixedBytes.id());
        buf.put_slice(self.snowflake.as_bytes());
        buf.put_u8(DataType::VarInt.id());
        varint::put_varint(&mut buf, self.id);
        buf.put_slice(body);
        buf.freeze()
    }

    /// Splits the packed packet into datagram-sized chunks sharing this
    /// packet's snowflake.
    pub fn chunkify(&self) -> Vec<Chunk> {
        chunk::chunkify(self.snowflake, self.pack())
    }
}

/// A fully reassembled packet received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingPacket {
    id: u32,
    snowflake: Snowflake,
    sender: SocketAddr,
    body: Bytes,
}

impl IncomingPacket {
    /// Parses the tail of a reassembled packet: tagged snowflake, tagged id
    /// varint, body as the remainder. The magic and length preamble must
    /// already be stripped and verified by the caller.
    pub fn parse(sender: SocketAddr, mut buf: Bytes) -> Result<Self> {
        if buf.remaining() < 1 + SNOWFLAKE_SIZE {
            return Err(Error::ErrMalformedPacket);
        }
        if buf.get_u8() != DataType::FixedBytes.id() {
            return Err(Error::ErrMalformedPacket);
        }
        let mut raw = [0u8; SNOWFLAKE_SIZE];
        buf.copy_to_slice(&mut raw);
        let snowflake = Snowflake::from_bytes(raw);

        if !buf.has_remaining() || buf.get_u8() != DataType::VarInt.id() {
            return Err(Error::ErrMalformedPacket);
        }
        let id = varint::get_varint(&mut buf)?;

        Ok(IncomingPacket {
            id,
            snowflake,
            sender,
            body: buf,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn snowflake(&self) -> Snowflake {
        self.snowflake
    }

    pub fn sender(&self) -> SocketAddr {
        self.sender
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// A cursor over the self-describing body fields.
    pub fn reader(&self) -> FieldReader {
        FieldReader::new(self.body.clone())
    }
}
