use thiserror::Error;

use crate::signal::RejectionReason;
use crate::snowflake::Snowflake;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("datagram does not start with the chunk magic")]
    ErrInvalidChunkMagic,
    #[error("chunk header is truncated or mistagged")]
    ErrMalformedChunk,
    #[error("chunk body length {length} exceeds the {max}-byte maximum")]
    ErrChunkLengthExceedsMax { length: usize, max: usize },
    #[error("chunk {snowflake} carries {actual} body bytes, length field says {declared}")]
    ErrChunkLengthMismatch {
        snowflake: Snowflake,
        declared: usize,
        actual: usize,
    },
    #[error("chunk {snowflake} body hash does not match")]
    ErrChunkHashMismatch { snowflake: Snowflake },
    #[error("chunk {snowflake} index {index} is outside its count {count}")]
    ErrChunkIndexOutOfRange {
        snowflake: Snowflake,
        index: u32,
        count: u32,
    },
    #[error("chunk {snowflake} declares an unreasonable count {count}")]
    ErrChunkCountTooLarge { snowflake: Snowflake, count: u32 },

    #[error("reassembled body of {snowflake} does not start with the packet magic")]
    ErrInvalidPacketMagic { snowflake: Snowflake },
    #[error("packet {snowflake} length field is unreadable")]
    ErrBadPacketLength { snowflake: Snowflake },
    #[error("packet {snowflake} declares {declared} bytes, body has {actual}")]
    ErrPacketLengthMismatch {
        snowflake: Snowflake,
        declared: usize,
        actual: usize,
    },
    #[error("packet preamble is truncated or mistagged")]
    ErrMalformedPacket,
    #[error("packet {snowflake} failed to parse ({reason})")]
    ErrPacketBodyParse {
        snowflake: Snowflake,
        reason: RejectionReason,
    },

    #[error("datagram does not start with the signal magic")]
    ErrInvalidSignalMagic,
    #[error("signal frame is truncated or mistagged")]
    ErrMalformedSignal,
    #[error("signal body is {len} bytes, the length field holds at most 255")]
    ErrSignalBodyTooLarge { len: usize },
    #[error("signal hash does not match")]
    ErrSignalHashMismatch,
    #[error("unknown signal kind {kind:#04x}")]
    ErrUnknownSignalKind { kind: u8 },
    #[error("unknown rejection reason {reason:#04x}")]
    ErrUnknownRejectionReason { reason: u8 },

    #[error("chunk for {snowflake} arrived from a different sender")]
    ErrSenderMismatch { snowflake: Snowflake },
    #[error("chunk for {snowflake} declares a different chunk count")]
    ErrCountMismatch { snowflake: Snowflake },

    #[error("{0}")]
    Codec(#[from] codec::Error),
}

impl Error {
    /// The rejection signal this failure warrants, when the offending
    /// snowflake is known. Sender mismatches stay silent: answering a
    /// spoofed snowflake would leak reassembly state to the spoofer.
    pub fn rejection(&self) -> Option<(Snowflake, RejectionReason)> {
        match self {
            Error::ErrChunkHashMismatch { snowflake } => {
                Some((*snowflake, RejectionReason::ChunkHashMismatch))
            }
            Error::ErrChunkLengthMismatch { snowflake, .. }
            | Error::ErrChunkIndexOutOfRange { snowflake, .. }
            | Error::ErrChunkCountTooLarge { snowflake, .. }
            | Error::ErrCountMismatch { snowflake } => {
                Some((*snowflake, RejectionReason::InvalidChunk))
            }
            Error::ErrInvalidPacketMagic { snowflake }
            | Error::ErrBadPacketLength { snowflake }
            | Error::ErrPacketLengthMismatch { snowflake, .. } => {
                Some((*snowflake, RejectionReason::InvalidPacket))
            }
            Error::ErrPacketBodyParse { snowflake, reason } => Some((*snowflake, *reason)),
            _ => None,
        }
    }

    /// Attaches a reassembly snowflake to a packet-parse failure,
    /// classifying embedded codec errors into a rejection reason.
    pub(crate) fn into_body_parse(self, snowflake: Snowflake) -> Error {
        let reason = match self {
            Error::Codec(codec::Error::ErrTypeMismatch { .. }) => {
                RejectionReason::FieldTypeMismatch
            }
            Error::Codec(codec::Error::ErrValueOutOfRange) => RejectionReason::BadFieldValue,
            _ => RejectionReason::InvalidPacket,
        };
        Error::ErrPacketBodyParse { snowflake, reason }
    }
}
