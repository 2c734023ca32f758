use super::*;

use crate::packet::OutgoingPacket;

#[test]
fn test_single_chunk_for_empty_packet() {
    let packet = OutgoingPacket::new(0x01);
    let packed = packet.pack();
    let chunks = packet.chunkify();

    assert_eq!(chunks.len(), 1);
    let chunk = &chunks[0];
    assert_eq!(chunk.index, 0);
    assert_eq!(chunk.count, 1);
    assert_eq!(chunk.body, packed);
    assert_eq!(chunk.snowflake, packet.snowflake());

    let raw = chunk.marshal();
    assert_eq!(raw[0], 0xFF);
    assert_eq!(&raw[1..5], &[0x47, 0x52, 0x52, 0x52]);
    assert_eq!(raw.len(), CHUNK_HEADER_SIZE + packed.len());
    assert!(is_chunk(&raw));
}

#[test]
fn test_chunkify_splits_and_preserves_bytes() {
    // 1.5 chunk bodies of pseudo-random payload
    let payload: Vec<u8> = (0..(MAX_CHUNK_BODY_SIZE * 3 / 2))
        .map(|i| (i * 31 % 251) as u8)
        .collect();
    let mut packet = OutgoingPacket::new(0x07);
    packet.writer().write_bytes(&payload);

    let packed = packet.pack();
    let chunks = packet.chunkify();

    assert_eq!(chunks.len(), 2);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i as u32);
        assert_eq!(chunk.count, 2);
        assert_eq!(chunk.snowflake, packet.snowflake());
        assert!(chunk.body.len() <= MAX_CHUNK_BODY_SIZE);
        assert_eq!(chunk.hash, xxh3_64(&chunk.body));
    }

    let mut joined = Vec::new();
    for chunk in &chunks {
        joined.extend_from_slice(&chunk.body);
    }
    assert_eq!(joined, packed);
}

#[test]
fn test_marshal_unmarshal_roundtrip() {
    let mut packet = OutgoingPacket::new(9);
    packet.writer().write_string("payload");

    for chunk in packet.chunkify() {
        let raw = chunk.marshal();
        let parsed = Chunk::unmarshal(&raw).unwrap();
        assert_eq!(parsed, chunk);
    }
}

#[test]
fn test_unmarshal_rejects_bad_magic() {
    let mut packet = OutgoingPacket::new(1);
    packet.writer().write_bool(true);
    let mut raw = packet.chunkify()[0].marshal().to_vec();
    raw[2] ^= 0xFF;

    let result = Chunk::unmarshal(&Bytes::from(raw));
    assert_eq!(result, Err(Error::ErrInvalidChunkMagic));
}

#[test]
fn test_unmarshal_rejects_corrupted_body() {
    let mut packet = OutgoingPacket::new(1);
    packet.writer().write_string("important data");
    let chunk = &packet.chunkify()[0];
    let mut raw = chunk.marshal().to_vec();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;

    let result = Chunk::unmarshal(&Bytes::from(raw));
    assert_eq!(
        result,
        Err(Error::ErrChunkHashMismatch {
            snowflake: chunk.snowflake,
        })
    );
}

#[test]
fn test_unmarshal_rejects_length_mismatch() {
    let mut packet = OutgoingPacket::new(1);
    packet.writer().write_string("abc");
    let chunk = &packet.chunkify()[0];
    let mut raw = chunk.marshal().to_vec();
    raw[7] = raw[7].wrapping_add(1); // low byte of the length field

    let result = Chunk::unmarshal(&Bytes::from(raw));
    assert!(matches!(
        result,
        Err(Error::ErrChunkLengthMismatch { .. })
    ));
}

#[test]
fn test_unmarshal_rejects_oversized_length() {
    let mut raw = vec![0xFFu8];
    raw.extend_from_slice(&CHUNK_MAGIC.to_be_bytes());
    raw.push(0x03);
    raw.extend_from_slice(&((MAX_CHUNK_BODY_SIZE as u16 + 1).to_be_bytes()));
    raw.resize(CHUNK_HEADER_SIZE, 0);

    let result = Chunk::unmarshal(&Bytes::from(raw));
    assert_eq!(
        result,
        Err(Error::ErrChunkLengthExceedsMax {
            length: MAX_CHUNK_BODY_SIZE + 1,
            max: MAX_CHUNK_BODY_SIZE,
        })
    );
}

#[test]
fn test_unmarshal_rejects_index_outside_count() {
    let mut packet = OutgoingPacket::new(1);
    packet.writer().write_bool(false);
    let chunk = &packet.chunkify()[0];
    let mut tampered = chunk.clone();
    tampered.index = 5;

    let result = Chunk::unmarshal(&tampered.marshal());
    assert_eq!(
        result,
        Err(Error::ErrChunkIndexOutOfRange {
            snowflake: chunk.snowflake,
            index: 5,
            count: 1,
        })
    );
}

#[test]
fn test_unmarshal_rejects_truncated_header() {
    let raw = Bytes::from_static(&[0xFF, 0x47, 0x52, 0x52, 0x52, 0x03]);
    assert_eq!(Chunk::unmarshal(&raw), Err(Error::ErrMalformedChunk));
}

#[test]
fn test_is_chunk_discriminates() {
    let mut packet = OutgoingPacket::new(1);
    packet.writer().write_bool(true);
    let raw = packet.chunkify()[0].marshal();
    assert!(is_chunk(&raw));
    assert!(!crate::signal::is_signal(&raw));
    assert!(!is_chunk(&[0x00, 0x01, 0x02]));
}
