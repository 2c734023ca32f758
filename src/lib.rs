//! SLIM is a lightweight datagram-oriented message protocol over UDP.
//!
//! Application packets are typed, self-describing records of structured
//! fields. Packets that exceed the datagram budget are transparently split
//! into fixed-size, hash-verified chunks and reassembled on the receiver; a
//! parallel signal channel on the same socket carries acknowledgements,
//! rejections, and keepalives.
//!
//! [`SlimSocket`] is the entry point: bind one in server or client mode,
//! build an [`OutgoingPacket`] with the field writer, `send` it, and consume
//! reassembled packets and parsed signals from the socket's two event
//! streams.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod socket;

pub use error::{Error, Result};
pub use socket::{IncomingSignal, SlimSocket};

pub use codec::{ArrayBuilder, DataType, FieldReader, FieldWriter};
pub use wire::chunk::{Chunk, CHUNK_MAGIC, MAX_CHUNK_BODY_SIZE, MAX_CHUNK_SIZE};
pub use wire::collector::ChunkCollector;
pub use wire::packet::{IncomingPacket, OutgoingPacket, PACKET_MAGIC};
pub use wire::signal::{RejectionReason, Signal, SignalKind, SIGNAL_MAGIC};
pub use wire::snowflake::Snowflake;
