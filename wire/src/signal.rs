
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use xxhash_rust::xxh3::xxh3_64;

use codec::data_type::DataType;
use codec::{ArrayBuilder, FieldReader, FieldWriter};

use crate::error::{Error, Result};
use crate::snowflake::{Snowflake, SNOWFLAKE_SIZE};

/// Four ASCII bytes "MEAT", tag-prefixed at the start of every signal
/// datagram.
pub const SIGNAL_MAGIC: u32 = 0x4D45_4154;

/// The one-byte length field bounds signal bodies.
pub const MAX_SIGNAL_BODY_SIZE: usize = 255;

/// Returns true if `b` looks like a signal datagram.
pub fn is_signal(b: &[u8]) -> bool {
    b.len() > 4
        && b[0] == DataType::Magic.id()
        && u32::from_be_bytes([b[1], b[2], b[3], b[4]]) == SIGNAL_MAGIC
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SignalKind {
    Acknowledged = 0x00,
    PartiallyAcknowledged = 0x01,
    Rejected = 0x02,
    Ping = 0x10,
    Pong = 0x11,
    Close = 0xFF,
}

impl TryFrom<u8> for SignalKind {
    type Error = Error;

    fn try_from(kind: u8) -> Result<Self> {
        match kind {
            0x00 => Ok(SignalKind::Acknowledged),
            0x01 => Ok(SignalKind::PartiallyAcknowledged),
            0x02 => Ok(SignalKind::Rejected),
            0x10 => Ok(SignalKind::Ping),
            0x11 => Ok(SignalKind::Pong),
            0xFF => Ok(SignalKind::Close),
            _ => Err(Error::ErrUnknownSignalKind { kind }),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Acknowledged => "acknowledged",
            SignalKind::PartiallyAcknowledged => "partiallyAcknowledged",
            SignalKind::Rejected => "rejected",
            SignalKind::Ping => "ping",
            SignalKind::Pong => "pong",
            SignalKind::Close => "close",
        };
        write!(f, "{s}")
    }
}

/// Why a packet or chunk was rejected; carried in the body of a
/// [`SignalKind::Rejected`] signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectionReason {
    ChunkHashMismatch = 0x00,
    InvalidChunk = 0x01,
    InvalidPacket = 0x02,
    FieldTypeMismatch = 0x03,
    BadFieldValue = 0x04,
    Timeout = 0xEF,
    RequestResend = 0xFF,
}

impl TryFrom<u8> for RejectionReason {
    type Error = Error;

    fn try_from(reason: u8) -> Result<Self> {
        match reason {
            0x00 => Ok(RejectionReason::ChunkHashMismatch),
            0x01 => Ok(RejectionReason::InvalidChunk),
            0x02 => Ok(RejectionReason::InvalidPacket),
            0x03 => Ok(RejectionReason::FieldTypeMismatch),
            0x04 => Ok(RejectionReason::BadFieldValue),
            0xEF => Ok(RejectionReason::Timeout),
            0xFF => Ok(RejectionReason::RequestResend),
            _ => Err(Error::ErrUnknownRejectionReason { reason }),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionReason::ChunkHashMismatch => "chunkHashMismatch",
            RejectionReason::InvalidChunk => "invalidChunk",
            RejectionReason::InvalidPacket => "invalidPacket",
            RejectionReason::FieldTypeMismatch => "fieldTypeMismatch",
            RejectionReason::BadFieldValue => "badFieldValue",
            RejectionReason::Timeout => "timeout",
            RejectionReason::RequestResend => "requestResend",
        };
        write!(f, "{s}")
    }
}

/// A small control message framed independently of packets.
///
/// ```text
/// [0xFF][magic u32=0x4D454154][0x02][length u8]
/// [0xFE][hash u64][0x02][type u8][body `length` B]
/// ```
///
/// The hash is XXH3-64 over the tagged type byte and the body. Signals are
/// stateless; receiving a duplicate has the same effect as receiving one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    kind: SignalKind,
    body: Bytes,
}

fn snowflake_body(snowflake: Snowflake) -> BytesMut {
    let mut body = BytesMut::with_capacity(1 + SNOWFLAKE_SIZE);
    body.put_u8(DataType::FixedBytes.id());
    body.put_slice(snowflake.as_bytes());
    body
}

impl Signal {
    pub fn ping() -> Signal {
        Signal {
            kind: SignalKind::Ping,
            body: Bytes::new(),
        }
    }

    pub fn pong() -> Signal {
        Signal {
            kind: SignalKind::Pong,
            body: Bytes::new(),
        }
    }

    pub fn close() -> Signal {
        Signal {
            kind: SignalKind::Close,
            body: Bytes::new(),
        }
    }

    pub fn acknowledged(snowflake: Snowflake) -> Signal {
        Signal {
            kind: SignalKind::Acknowledged,
            body: snowflake_body(snowflake).freeze(),
        }
    }

    /// Acknowledges a partial reassembly, listing the chunk indexes still
    /// missing. Fails when the index array pushes the body past the
    /// one-byte length budget.
    pub fn partially_acknowledged(snowflake: Snowflake, missing: &[u32]) -> Result<Signal> {
        let mut body = snowflake_body(snowflake);
        let mut writer = FieldWriter::new();
        let mut indexes = ArrayBuilder::typed(DataType::Integer);
        for &index in missing {
            indexes.write_integer(i64::from(index), false)?;
        }
        writer.write_array(indexes)?;
        body.put_slice(writer.as_slice());
        if body.len() > MAX_SIGNAL_BODY_SIZE {
            return Err(Error::ErrSignalBodyTooLarge { len: body.len() });
        }
        Ok(Signal {
            kind: SignalKind::PartiallyAcknowledged,
            body: body.freeze(),
        })
    }

    pub fn rejected(snowflake: Snowflake, reason: Option<RejectionReason>) -> Signal {
        let mut body = snowflake_body(snowflake);
        if let Some(reason) = reason {
            body.put_u8(DataType::Byte.id());
            body.put_u8(reason as u8);
        }
        Signal {
            kind: SignalKind::Rejected,
            body: body.freeze(),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The snowflake named by an acknowledgement or rejection body, if the
    /// signal carries one.
    pub fn snowflake(&self) -> Option<Snowflake> {
        if !matches!(
            self.kind,
            SignalKind::Acknowledged | SignalKind::PartiallyAcknowledged | SignalKind::Rejected
        ) {
            return None;
        }
        if self.body.len() < 1 + SNOWFLAKE_SIZE || self.body[0] != DataType::FixedBytes.id() {
            return None;
        }
        let mut raw = [0u8; SNOWFLAKE_SIZE];
        raw.copy_from_slice(&self.body[1..1 + SNOWFLAKE_SIZE]);
        Some(Snowflake::from_bytes(raw))
    }

    /// The reason carried by a rejection body, if present.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        if self.kind != SignalKind::Rejected {
            return None;
        }
        let tail = self.body.get(1 + SNOWFLAKE_SIZE..)?;
        if tail.len() < 2 || tail[0] != DataType::Byte.id() {
            return None;
        }
        RejectionReason::try_from(tail[1]).ok()
    }

    /// The missing chunk indexes listed by a partial acknowledgement.
    pub fn missing_indexes(&self) -> Option<Vec<u32>> {
        if self.kind != SignalKind::PartiallyAcknowledged {
            return None;
        }
        if self.body.len() < 1 + SNOWFLAKE_SIZE {
            return None;
        }
        let mut reader = FieldReader::new(self.body.slice(1 + SNOWFLAKE_SIZE..));
        reader
            .read_array(DataType::Integer, |r| {
                Ok(r.read_integer()?.unwrap_or_default() as u32)
            })
            .ok()
            .flatten()
    }

    fn hash(&self) -> u64 {
        let mut hashed = BytesMut::with_capacity(2 + self.body.len());
        hashed.put_u8(DataType::Byte.id());
        hashed.put_u8(self.kind as u8);
        hashed.put_slice(&self.body);
        xxh3_64(&hashed)
    }

    pub fn marshal(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(7 + 9 + 2 + self.body.len());
        buf.put_u8(DataType::Magic.id());
        buf.put_u32(SIGNAL_MAGIC);
        buf.put_u8(DataType::Byte.id());
        buf.put_u8(self.body.len() as u8);
        buf.put_u8(DataType::FixedBytes.id());
        buf.put_u64(self.hash());
        buf.put_u8(DataType::Byte.id());
        buf.put_u8(self.kind as u8);
        buf.put_slice(&self.body);
        buf.freeze()
    }

    /// Parses and integrity-checks one signal datagram. The length may be
    /// tagged `none` instead of `byte`, in which case it is zero and no
    /// length byte follows.
    pub fn unmarshal(raw: &Bytes) -> Result<Signal> {
        let mut buf = raw.clone();
        if buf.remaining() < 6 {
            return Err(Error::ErrMalformedSignal);
        }

        if buf.get_u8() != DataType::Magic.id() || buf.get_u32() != SIGNAL_MAGIC {
            return Err(Error::ErrInvalidSignalMagic);
        }

        let length_tag = buf.get_u8();
        let length = if length_tag == DataType::None.id() {
            0
        } else if length_tag == DataType::Byte.id() {
            if !buf.has_remaining() {
                return Err(Error::ErrMalformedSignal);
            }
            buf.get_u8() as usize
        } else {
            return Err(Error::ErrMalformedSignal);
        };

        if buf.remaining() != 1 + 8 + 2 + length {
            return Err(Error::ErrMalformedSignal);
        }

        if buf.get_u8() != DataType::FixedBytes.id() {
            return Err(Error::ErrMalformedSignal);
        }
        let hash = buf.get_u64();

        if buf.get_u8() != DataType::Byte.id() {
            return Err(Error::ErrMalformedSignal);
        }
        let kind_byte = buf.get_u8();
        let body = buf.copy_to_bytes(length);

        let mut hashed = BytesMut::with_capacity(2 + body.len());
        hashed.put_u8(DataType::Byte.id());
        hashed.put_u8(kind_byte);
        hashed.put_slice(&body);
        if xxh3_64(&hashed) != hash {
            return Err(Error::ErrSignalHashMismatch);
        }

        Ok(Signal {
            kind: SignalKind::try_from(kind_byte)?,
            body,
        })
    }
}
