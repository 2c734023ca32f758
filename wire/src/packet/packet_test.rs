use super::*;

fn test_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[test]
fn test_pack_layout() {
    let snowflake = Snowflake::from_bytes([7u8; SNOWFLAKE_SIZE]);
    let mut packet = OutgoingPacket::with_snowflake(0x02, snowflake);
    packet.writer().write_string("Howdy!");

    let packed = packet.pack();

    // tagged magic
    assert_eq!(packed[0], 0xFF);
    assert_eq!(&packed[1..5], &[0x4D, 0x55, 0x53, 0x54]);
    // tagged length varint: snowflake (17) + id (2) + body (8)
    assert_eq!(packed[5], 0x08);
    assert_eq!(packed[6], 27);
    // tagged snowflake
    assert_eq!(packed[7], 0xFE);
    assert_eq!(&packed[8..24], &[7u8; SNOWFLAKE_SIZE]);
    // tagged id
    assert_eq!(packed[24], 0x08);
    assert_eq!(packed[25], 0x02);
    // body: tagged string
    assert_eq!(&packed[26..], &[0x20, 0x06, b'H', b'o', b'w', b'd', b'y', b'!']);
}

#[test]
fn test_pack_length_covers_everything_after_the_length_field() {
    let mut packet = OutgoingPacket::new(300);
    packet.writer().write_varint(12345);
    packet.writer().write_bool(true);

    let mut packed = packet.pack();
    packed.advance(5); // tagged magic
    assert_eq!(packed.get_u8(), 0x08);
    let declared = varint::get_varint(&mut packed).unwrap() as usize;
    assert_eq!(declared, packed.remaining());
}

#[test]
fn test_parse_roundtrip() {
    let mut packet = OutgoingPacket::new(0x42);
    packet.writer().write_string("hello");
    packet.writer().write_varint(-7);

    // strip the tagged magic and tagged length, as the collector does
    let mut packed = packet.pack();
    packed.advance(5);
    packed.advance(1);
    varint::get_varint(&mut packed).unwrap();

    let parsed = IncomingPacket::parse(test_addr(), packed).unwrap();
    assert_eq!(parsed.id(), 0x42);
    assert_eq!(parsed.snowflake(), packet.snowflake());
    assert_eq!(parsed.sender(), test_addr());

    let mut reader = parsed.reader();
    assert_eq!(reader.read_string().unwrap(), Some("hello".to_owned()));
    assert_eq!(reader.read_varint().unwrap(), Some(-7));
    assert!(reader.is_empty());
}

#[test]
fn test_parse_empty_body() {
    let packet = OutgoingPacket::new(0x01);
    let mut packed = packet.pack();
    packed.advance(6);
    varint::get_varint(&mut packed).unwrap();

    let parsed = IncomingPacket::parse(test_addr(), packed).unwrap();
    assert_eq!(parsed.id(), 0x01);
    assert!(parsed.body().is_empty());
}

#[test]
fn test_parse_rejects_missing_snowflake_tag() {
    let mut raw = BytesMut::new();
    raw.put_u8(0x04); // integer tag where fixedBytes belongs
    raw.put_slice(&[0u8; SNOWFLAKE_SIZE]);
    raw.put_u8(0x08);
    raw.put_u8(0x01);

    let result = IncomingPacket::parse(test_addr(), raw.freeze());
    assert_eq!(result, Err(Error::ErrMalformedPacket));
}

#[test]
fn test_parse_rejects_truncated_preamble() {
    let raw = Bytes::from_static(&[0xFE, 1, 2, 3]);
    let result = IncomingPacket::parse(test_addr(), raw);
    assert_eq!(result, Err(Error::ErrMalformedPacket));
}

#[test]
fn test_fresh_packets_get_distinct_snowflakes() {
    let a = OutgoingPacket::new(1);
    let b = OutgoingPacket::new(1);
    assert_ne!(a.snowflake(), b.snowflake());
}
