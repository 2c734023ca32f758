use super::*;

use crate::writer::{ArrayBuilder, FieldWriter};

fn reader_for(w: FieldWriter) -> FieldReader {
    FieldReader::new(w.finish())
}

#[test]
fn test_reader_scalar_roundtrip() {
    let mut w = FieldWriter::new();
    w.write_bool(true);
    w.write_byte(200, false).unwrap();
    w.write_byte(-100, true).unwrap();
    w.write_short(40000, false).unwrap();
    w.write_short(-20000, true).unwrap();
    w.write_integer(3_000_000_000, false).unwrap();
    w.write_integer(-42, true).unwrap();
    w.write_long(i64::MAX, false).unwrap();
    w.write_long(i64::MIN, true).unwrap();
    w.write_float(2.5);
    w.write_double(-0.125);
    w.write_varint(-1);
    w.write_varlong(1 << 40);
    w.write_string("Howdy!");
    w.write_bytes(&[1, 2, 3]);

    let mut r = reader_for(w);
    assert_eq!(r.read_bool().unwrap(), Some(true));
    assert_eq!(r.read_byte().unwrap(), Some(200));
    assert_eq!(r.read_byte().unwrap(), Some(-100));
    assert_eq!(r.read_short().unwrap(), Some(40000));
    assert_eq!(r.read_short().unwrap(), Some(-20000));
    assert_eq!(r.read_integer().unwrap(), Some(3_000_000_000));
    assert_eq!(r.read_integer().unwrap(), Some(-42));
    assert_eq!(r.read_long().unwrap(), Some(i64::MAX));
    assert_eq!(r.read_long().unwrap(), Some(i64::MIN));
    assert_eq!(r.read_float().unwrap(), Some(2.5));
    assert_eq!(r.read_double().unwrap(), Some(-0.125));
    assert_eq!(r.read_varint().unwrap(), Some(-1));
    assert_eq!(r.read_varlong().unwrap(), Some(1 << 40));
    assert_eq!(r.read_string().unwrap(), Some("Howdy!".to_owned()));
    assert_eq!(r.read_bytes().unwrap().as_deref(), Some(&[1u8, 2, 3][..]));
    assert!(r.is_empty());
}

#[test]
fn test_reader_none_fields() {
    let mut w = FieldWriter::new();
    w.write_none();
    w.write_string("");
    w.write_bytes(&[]);

    let mut r = reader_for(w);
    assert_eq!(r.read_varint().unwrap(), None);
    assert_eq!(r.read_string().unwrap(), None);
    assert_eq!(r.read_bytes().unwrap(), None);
}

#[test]
fn test_reader_type_mismatch() {
    let mut w = FieldWriter::new();
    w.write_string("hello");

    let mut r = reader_for(w);
    let result = r.read_varint();
    assert_eq!(
        result,
        Err(Error::ErrTypeMismatch {
            expected: DataType::VarInt,
            actual: DataType::String,
        })
    );
}

#[test]
fn test_reader_past_end() {
    let mut r = FieldReader::new(Bytes::new());
    assert_eq!(r.read_bool(), Err(Error::ErrReadPastEnd));

    // tag present, payload truncated
    let mut r = FieldReader::new(Bytes::from_static(&[0x04, 0x00, 0x01]));
    assert_eq!(r.read_integer(), Err(Error::ErrReadPastEnd));

    // declared string length exceeds the remaining bytes
    let mut r = FieldReader::new(Bytes::from_static(&[0x20, 0x05, b'h', b'i']));
    assert_eq!(r.read_string(), Err(Error::ErrReadPastEnd));
}

#[test]
fn test_reader_unknown_tag() {
    let mut r = FieldReader::new(Bytes::from_static(&[0x42]));
    assert_eq!(r.read_bool(), Err(Error::ErrUnknownTypeId { id: 0x42 }));
}

#[test]
fn test_typed_array_roundtrip() {
    let mut arr = ArrayBuilder::typed(DataType::VarInt);
    for v in [3, 1, 4, 1, 5] {
        arr.write_varint(v).unwrap();
    }
    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();

    let mut r = reader_for(w);
    let got = r
        .read_array(DataType::VarInt, |r| {
            Ok(r.read_varint()?.unwrap_or_default())
        })
        .unwrap();
    assert_eq!(got, Some(vec![3, 1, 4, 1, 5]));
    assert!(r.is_empty());
}

#[test]
fn test_signed_array_roundtrip() {
    let mut arr = ArrayBuilder::typed(DataType::SignedInteger);
    for v in [-3i64, 0, 7] {
        arr.write_integer(v, true).unwrap();
    }
    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();

    // the caller may ask for the unsigned name; signedness comes off the wire
    let mut r = reader_for(w);
    let got = r
        .read_array(DataType::Integer, |r| {
            Ok(r.read_integer()?.unwrap_or_default())
        })
        .unwrap();
    assert_eq!(got, Some(vec![-3, 0, 7]));
}

#[test]
fn test_string_array_roundtrip() {
    let mut arr = ArrayBuilder::typed(DataType::String);
    arr.write_string("a").unwrap();
    arr.write_string("").unwrap();
    arr.write_string("ccc").unwrap();

    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();

    let mut r = reader_for(w);
    let got = r
        .read_array(DataType::String, |r| {
            Ok(r.read_string()?.unwrap_or_default())
        })
        .unwrap();
    assert_eq!(got, Some(vec!["a".to_owned(), String::new(), "ccc".to_owned()]));
}

#[test]
fn test_untyped_array_roundtrip() {
    let mut arr = ArrayBuilder::untyped();
    arr.write_varint(9).unwrap();
    arr.write_varint(10).unwrap();

    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();

    let mut r = reader_for(w);
    let got = r
        .read_array(DataType::VarInt, |r| {
            Ok(r.read_varint()?.unwrap_or_default())
        })
        .unwrap();
    assert_eq!(got, Some(vec![9, 10]));
}

#[test]
fn test_empty_array_reads_none() {
    let arr = ArrayBuilder::typed(DataType::VarInt);
    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();

    let mut r = reader_for(w);
    let got = r
        .read_array(DataType::VarInt, |r| {
            Ok(r.read_varint()?.unwrap_or_default())
        })
        .unwrap();
    assert_eq!(got, None);
}

#[test]
fn test_explicit_zero_count_array_reads_none() {
    // a foreign writer may emit the full composite with a zero count
    let mut r = FieldReader::new(Bytes::from_static(&[0x22, 0x00, 0x08]));
    let got = r
        .read_array(DataType::VarInt, |r| {
            Ok(r.read_varint()?.unwrap_or_default())
        })
        .unwrap();
    assert_eq!(got, None);
    assert!(r.is_empty());
}

#[test]
fn test_array_element_type_mismatch() {
    let mut arr = ArrayBuilder::typed(DataType::String);
    arr.write_string("x").unwrap();
    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();

    let mut r = reader_for(w);
    let result = r.read_array(DataType::VarInt, |r| {
        Ok(r.read_varint()?.unwrap_or_default())
    });
    assert_eq!(
        result,
        Err(Error::ErrTypeMismatch {
            expected: DataType::VarInt,
            actual: DataType::String,
        })
    );
}

#[test]
fn test_fields_after_array_keep_their_tags() {
    let mut arr = ArrayBuilder::typed(DataType::Byte);
    arr.write_byte(1, false).unwrap();
    let mut w = FieldWriter::new();
    w.write_array(arr).unwrap();
    w.write_string("tail");

    let mut r = reader_for(w);
    r.read_array(DataType::Byte, |r| Ok(r.read_byte()?.unwrap_or_default()))
        .unwrap();
    assert_eq!(r.read_string().unwrap(), Some("tail".to_owned()));
}
