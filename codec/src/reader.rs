#[cfg(test)]
mod reader_test;

use bytes::{Buf, Bytes};

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::varint;

/// FieldReader walks a self-describing body, one tagged field at a time.
///
/// Every read consumes the field's leading tag first: a `none` tag yields
/// `Ok(None)`, a tag of the wrong type fails with
/// [`Error::ErrTypeMismatch`], and running out of bytes fails with
/// [`Error::ErrReadPastEnd`]. Inside a typed array the element tag is
/// factored out; the reader then holds it as state instead of consuming a
/// byte per element.
#[derive(Debug)]
pub struct FieldReader {
    buf: Bytes,
    element_tag: Option<DataType>,
}

impl FieldReader {
    pub fn new(buf: Bytes) -> Self {
        FieldReader {
            buf,
            element_tag: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn next_tag(&mut self) -> Result<DataType> {
        if let Some(tag) = self.element_tag {
            return Ok(tag);
        }
        if !self.buf.has_remaining() {
            return Err(Error::ErrReadPastEnd);
        }
        DataType::try_from(self.buf.get_u8())
    }

    /// Consumes the next tag, returning `None` for a `none` field and the
    /// actual tag when it matches `expected` (either signedness for integer
    /// types).
    fn expect_tag(&mut self, expected: DataType) -> Result<Option<DataType>> {
        let tag = self.next_tag()?;
        if tag == DataType::None {
            return Ok(None);
        }
        if tag.unsigned() != expected.unsigned() {
            return Err(Error::ErrTypeMismatch {
                expected,
                actual: tag,
            });
        }
        Ok(Some(tag))
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::ErrReadPastEnd);
        }
        Ok(())
    }

    pub fn read_bool(&mut self) -> Result<Option<bool>> {
        if self.expect_tag(DataType::Boolean)?.is_none() {
            return Ok(None);
        }
        self.need(1)?;
        Ok(Some(self.buf.get_u8() != 0))
    }

    fn read_int(&mut self, unsigned: DataType, bits: u32) -> Result<Option<i64>> {
        let tag = match self.expect_tag(unsigned)? {
            Some(tag) => tag,
            None => return Ok(None),
        };
        self.need((bits / 8) as usize)?;
        let v = match (bits, tag.is_signed()) {
            (8, false) => i64::from(self.buf.get_u8()),
            (8, true) => i64::from(self.buf.get_i8()),
            (16, false) => i64::from(self.buf.get_u16()),
            (16, true) => i64::from(self.buf.get_i16()),
            (32, false) => i64::from(self.buf.get_u32()),
            (32, true) => i64::from(self.buf.get_i32()),
            _ => self.buf.get_i64(),
        };
        Ok(Some(v))
    }

    /// Accepts either the unsigned or signed variant tag, zero- or
    /// sign-extending to i64 accordingly. Likewise for the wider reads.
    pub fn read_byte(&mut self) -> Result<Option<i64>> {
        self.read_int(DataType::Byte, 8)
    }

    pub fn read_short(&mut self) -> Result<Option<i64>> {
        self.read_int(DataType::Short, 16)
    }

    pub fn read_integer(&mut self) -> Result<Option<i64>> {
        self.read_int(DataType::Integer, 32)
    }

    pub fn read_long(&mut self) -> Result<Option<i64>> {
        self.read_int(DataType::Long, 64)
    }

    pub fn read_float(&mut self) -> Result<Option<f32>> {
        if self.expect_tag(DataType::Float)?.is_none() {
            return Ok(None);
        }
        self.need(4)?;
        Ok(Some(f32::from_bits(self.buf.get_u32())))
    }

    pub fn read_double(&mut self) -> Result<Option<f64>> {
        if self.expect_tag(DataType::Double)?.is_none() {
            return Ok(None);
        }
        self.need(8)?;
        Ok(Some(f64::from_bits(self.buf.get_u64())))
    }

    pub fn read_varint(&mut self) -> Result<Option<i32>> {
        if self.expect_tag(DataType::VarInt)?.is_none() {
            return Ok(None);
        }
        Ok(Some(varint::get_varint(&mut self.buf)? as i32))
    }

    pub fn read_varlong(&mut self) -> Result<Option<i64>> {
        if self.expect_tag(DataType::VarLong)?.is_none() {
            return Ok(None);
        }
        Ok(Some(varint::get_varlong(&mut self.buf)? as i64))
    }

    pub fn read_string(&mut self) -> Result<Option<String>> {
        if self.expect_tag(DataType::String)?.is_none() {
            return Ok(None);
        }
        let len = varint::get_varint(&mut self.buf)? as usize;
        self.need(len)?;
        let raw = self.buf.split_to(len);
        Ok(Some(String::from_utf8(raw.to_vec())?))
    }

    pub fn read_bytes(&mut self) -> Result<Option<Bytes>> {
        if self.expect_tag(DataType::Bytes)?.is_none() {
            return Ok(None);
        }
        let len = varint::get_varint(&mut self.buf)? as usize;
        self.need(len)?;
        Ok(Some(self.buf.split_to(len)))
    }

    /// Reads an array of `element_type`, invoking `read_element` once per
    /// element. For a typed array the factored-out element tag is supplied
    /// to every element read; an element-type byte of `none` marks an
    /// untyped array whose elements carry their own tags. A count of zero
    /// yields `None`, the same convention as empty strings and blobs.
    pub fn read_array<T, F>(&mut self, element_type: DataType, mut read_element: F) -> Result<Option<Vec<T>>>
    where
        F: FnMut(&mut FieldReader) -> Result<T>,
    {
        if self.expect_tag(DataType::Array)?.is_none() {
            return Ok(None);
        }
        let count = varint::get_varint(&mut self.buf)? as usize;
        if !self.buf.has_remaining() {
            return Err(Error::ErrReadPastEnd);
        }
        let elem = DataType::try_from(self.buf.get_u8())?;
        if count == 0 {
            return Ok(None);
        }
        if elem != DataType::None && elem.unsigned() != element_type.unsigned() {
            return Err(Error::ErrTypeMismatch {
                expected: element_type,
                actual: elem,
            });
        }

        let prev = self.element_tag;
        self.element_tag = if elem == DataType::None { None } else { Some(elem) };
        let mut out = Vec::new();
        for _ in 0..count {
            match read_element(self) {
                Ok(v) => out.push(v),
                Err(e) => {
                    self.element_tag = prev;
                    return Err(e);
                }
            }
        }
        self.element_tag = prev;
        Ok(Some(out))
    }
}
