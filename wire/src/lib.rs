//! Packet framing, chunking, signals, and reassembly for the SLIM protocol.
//!
//! A packed packet that exceeds the datagram budget is split into
//! fixed-size, hash-verified chunks sharing a 16-byte snowflake; the
//! [`collector::ChunkCollector`] buffers arriving chunks and hands back the
//! reassembled packet once the set is complete. Control traffic rides the
//! same transport as [`signal::Signal`] frames.

#![warn(rust_2018_idioms)]

pub mod chunk;
pub mod collector;
pub mod error;
pub mod packet;
pub mod signal;
pub mod snowflake;

pub use chunk::{chunkify, is_chunk, Chunk, CHUNK_HEADER_SIZE, CHUNK_MAGIC, MAX_CHUNK_BODY_SIZE, MAX_CHUNK_SIZE};
pub use collector::{ChunkCollector, REASSEMBLY_TIMEOUT};
pub use error::{Error, Result};
pub use packet::{IncomingPacket, OutgoingPacket, PACKET_MAGIC};
pub use signal::{is_signal, RejectionReason, Signal, SignalKind, SIGNAL_MAGIC};
pub use snowflake::{Snowflake, SNOWFLAKE_SIZE};
