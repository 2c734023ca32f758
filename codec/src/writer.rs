
use bytes::{BufMut, Bytes, BytesMut};

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::varint;

/// FieldWriter accumulates a sequence of tagged, self-describing fields into
/// a growable buffer. Each write appends a one-byte type tag followed by the
/// value's payload.
///
/// Empty strings, empty byte blobs, and zero-element arrays are written as a
/// single `none` tag; a receiver cannot distinguish empty from absent.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: BytesMut,
}

fn check_width(value: i64, bits: u32, signed: bool) -> Result<()> {
    if bits == 64 {
        // The writer API is i64, so an unsigned long is representable only
        // up to i64::MAX.
        if signed || value >= 0 {
            return Ok(());
        }
        return Err(Error::ErrValueOutOfRange);
    }
    let ok = if signed {
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        value >= min && value <= max
    } else {
        value >= 0 && value < (1i64 << bits)
    };
    if ok {
        Ok(())
    } else {
        Err(Error::ErrValueOutOfRange)
    }
}

fn put_int_payload<B: BufMut>(buf: &mut B, value: i64, bits: u32) {
    match bits {
        8 => buf.put_u8(value as u8),
        16 => buf.put_u16(value as u16),
        32 => buf.put_u32(value as u32),
        _ => buf.put_u64(value as u64),
    }
}

impl FieldWriter {
    pub fn new() -> Self {
        FieldWriter {
            buf: BytesMut::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and yields the encoded body.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn put_tag(&mut self, tag: DataType) {
        self.buf.put_u8(tag.id());
    }

    pub fn write_none(&mut self) {
        self.put_tag(DataType::None);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.put_tag(DataType::Boolean);
        self.buf.put_u8(value as u8);
    }

    fn write_int(&mut self, tag: DataType, value: i64, bits: u32, signed: bool) -> Result<()> {
        check_width(value, bits, signed)?;
        self.put_tag(if signed { tag.signed() } else { tag });
        put_int_payload(&mut self.buf, value, bits);
        Ok(())
    }

    pub fn write_byte(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Byte, value, 8, signed)
    }

    pub fn write_short(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Short, value, 16, signed)
    }

    pub fn write_integer(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Integer, value, 32, signed)
    }

    pub fn write_long(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Long, value, 64, signed)
    }

    pub fn write_float(&mut self, value: f32) {
        self.put_tag(DataType::Float);
        self.buf.put_u32(value.to_bits());
    }

    pub fn write_double(&mut self, value: f64) {
        self.put_tag(DataType::Double);
        self.buf.put_u64(value.to_bits());
    }

    pub fn write_varint(&mut self, value: i32) {
        self.put_tag(DataType::VarInt);
        varint::put_varint(&mut self.buf, value as u32);
    }

    pub fn write_varlong(&mut self, value: i64) {
        self.put_tag(DataType::VarLong);
        varint::put_varlong(&mut self.buf, value as u64);
    }

    /// An empty string is written as a single `none` tag.
    pub fn write_string(&mut self, value: &str) {
        if value.is_empty() {
            self.write_none();
            return;
        }
        self.put_tag(DataType::String);
        varint::put_varint(&mut self.buf, value.len() as u32);
        self.buf.put_slice(value.as_bytes());
    }

    /// An empty blob is written as a single `none` tag.
    pub fn write_bytes(&mut self, value: &[u8]) {
        if value.is_empty() {
            self.write_none();
            return;
        }
        self.put_tag(DataType::Bytes);
        varint::put_varint(&mut self.buf, value.len() as u32);
        self.buf.put_slice(value);
    }

    /// A zero-element array is written as a single `none` tag, the same
    /// aliasing applied to empty strings and blobs. A builder constructed
    /// with an exact length still has that length enforced here.
    pub fn write_array(&mut self, array: ArrayBuilder) -> Result<()> {
        array.validate()?;
        if array.count == 0 {
            self.write_none();
            return Ok(());
        }
        self.put_tag(DataType::Array);
        varint::put_varint(&mut self.buf, array.count);
        self.buf
            .put_u8(array.element_type.unwrap_or(DataType::None).id());
        self.buf.put_slice(&array.buf);
        Ok(())
    }
}

/// ArrayBuilder collects the elements of one array field.
///
/// A typed builder fixes the element tag at construction and writes elements
/// without per-element tags; the tag is emitted once in the built layout. An
/// untyped builder emits a tag before every element and marks itself on the
/// wire with a `none` element-type byte.
#[derive(Debug)]
pub struct ArrayBuilder {
    element_type: Option<DataType>,
    expected_len: Option<usize>,
    count: u32,
    buf: BytesMut,
}

impl ArrayBuilder {
    pub fn typed(element_type: DataType) -> Self {
        ArrayBuilder {
            element_type: Some(element_type),
            expected_len: None,
            count: 0,
            buf: BytesMut::new(),
        }
    }

    pub fn untyped() -> Self {
        ArrayBuilder {
            element_type: None,
            expected_len: None,
            count: 0,
            buf: BytesMut::new(),
        }
    }

    /// Enforces an exact element count when the array is built.
    pub fn with_len(mut self, len: usize) -> Self {
        self.expected_len = Some(len);
        self
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn begin_element(&mut self, tag: DataType) -> Result<()> {
        match self.element_type {
            Some(expected) if expected != tag => Err(Error::ErrTypeMismatch {
                expected,
                actual: tag,
            }),
            Some(_) => {
                self.count += 1;
                Ok(())
            }
            None => {
                self.count += 1;
                self.buf.put_u8(tag.id());
                Ok(())
            }
        }
    }

    /// Only meaningful in untyped arrays; a typed array cannot hold `none`
    /// elements because the factored-out tag leaves nothing to mark them.
    pub fn write_none(&mut self) -> Result<()> {
        self.begin_element(DataType::None)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.begin_element(DataType::Boolean)?;
        self.buf.put_u8(value as u8);
        Ok(())
    }

    fn write_int(&mut self, tag: DataType, value: i64, bits: u32, signed: bool) -> Result<()> {
        check_width(value, bits, signed)?;
        self.begin_element(if signed { tag.signed() } else { tag })?;
        put_int_payload(&mut self.buf, value, bits);
        Ok(())
    }

    pub fn write_byte(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Byte, value, 8, signed)
    }

    pub fn write_short(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Short, value, 16, signed)
    }

    pub fn write_integer(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Integer, value, 32, signed)
    }

    pub fn write_long(&mut self, value: i64, signed: bool) -> Result<()> {
        self.write_int(DataType::Long, value, 64, signed)
    }

    pub fn write_float(&mut self, value: f32) -> Result<()> {
        self.begin_element(DataType::Float)?;
        self.buf.put_u32(value.to_bits());
        Ok(())
    }

    pub fn write_double(&mut self, value: f64) -> Result<()> {
        self.begin_element(DataType::Double)?;
        self.buf.put_u64(value.to_bits());
        Ok(())
    }

    pub fn write_varint(&mut self, value: i32) -> Result<()> {
        self.begin_element(DataType::VarInt)?;
        varint::put_varint(&mut self.buf, value as u32);
        Ok(())
    }

    pub fn write_varlong(&mut self, value: i64) -> Result<()> {
        self.begin_element(DataType::VarLong)?;
        varint::put_varlong(&mut self.buf, value as u64);
        Ok(())
    }

    /// Elements are length-prefixed without the empty-as-`none` aliasing the
    /// outer writer applies; an empty element is a zero-length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.begin_element(DataType::String)?;
        varint::put_varint(&mut self.buf, value.len() as u32);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.begin_element(DataType::Bytes)?;
        varint::put_varint(&mut self.buf, value.len() as u32);
        self.buf.put_slice(value);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(expected) = self.expected_len {
            if expected != self.count as usize {
                return Err(Error::ErrArrayLengthMismatch {
                    expected,
                    actual: self.count as usize,
                });
            }
        }
        Ok(())
    }

    /// Builds the composite layout: `[varInt count][element-type byte]
    /// [element 0][element 1]...`. Untyped builders mark the element type as
    /// `none` and each element carries its own tag.
    pub fn build(self) -> Result<Bytes> {
        self.validate()?;
        let mut out = BytesMut::with_capacity(varint::MAX_VARINT_LEN + 1 + self.buf.len());
        varint::put_varint(&mut out, self.count);
        out.put_u8(self.element_type.unwrap_or(DataType::None).id());
        out.put_slice(&self.buf);
        Ok(out.freeze())
    }
}
