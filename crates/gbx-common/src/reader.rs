//! Binary reader for zero-copy parsing of GBX byte slices.
//!
//! This module provides [`BinaryReader`], a cursor over a byte slice that
//! reads the little-endian primitives GBX streams are made of.

use zerocopy::FromBytes;

use crate::{Error, Result};

/// Cursor over a GBX byte slice. Slices it returns borrow from the input.
///
/// All multi-byte values are little-endian. GBX booleans are 32-bit and GBX
/// strings carry a `u32` byte-length prefix.
///
/// # Example
///
/// ```
/// use gbx_common::BinaryReader;
///
/// let data = [0x03, 0x00, 0x00, 0x00, b'G', b'B', b'X'];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_string().unwrap(), "GBX");
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Offset of the next byte to read.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Everything from the cursor to the end of the input.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Bytes between `start` and the current position.
    ///
    /// Used to keep a raw copy of whatever was just decoded.
    #[inline]
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        let end = self.position.min(self.data.len());
        &self.data[start.min(end)..end]
    }

    /// The next `count` bytes, leaving the cursor in place.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                offset: self.position,
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// The next `count` bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// GBX booleans are 32 bits wide; any non-zero value is true.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_u32().map(|v| v != 0)
    }

    /// Read a `u32` length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<&'a str> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(Error::Utf8)
    }

    /// Read a `u32` length-prefixed byte blob.
    pub fn read_data(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    /// Plain-old-data record read straight from the input.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let offset = self.position;
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            offset,
            needed: size,
            available: bytes.len(),
        })
    }

    /// Next `u32`, leaving the cursor in place.
    #[inline]
    pub fn peek_u32(&self) -> Result<u32> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.peek_bytes(4)?);
        Ok(u32::from_le_bytes(word))
    }

    /// Consume `expected` or fail with [`Error::InvalidMagic`].
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<()> {
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(Error::InvalidMagic {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0x00, 0x00, 0x80, 0x3F, // f32: 1.0
            0x02, 0x00, 0x00, 0x00, // bool: true
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert!(reader.read_bool().unwrap());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_string() {
        let data = b"\x05\x00\x00\x00hello\x00\x00\x00\x00";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_string().unwrap(), "hello");
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn test_consumed_since() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let mut reader = BinaryReader::new(&data);
        reader.read_u8().unwrap();

        let start = reader.position();
        reader.read_u16().unwrap();
        assert_eq!(reader.consumed_since(start), &[0xBB, 0xCC]);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let reader = BinaryReader::new(&data);

        assert_eq!(reader.peek_u32().unwrap(), 0x04030201);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_eof_error_reports_offset() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = BinaryReader::new(&data);
        reader.read_u8().unwrap();

        match reader.read_u32() {
            Err(Error::UnexpectedEof {
                offset,
                needed,
                available,
            }) => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected EOF, got {:?}", other),
        }
    }

    #[test]
    fn test_expect_magic() {
        let mut reader = BinaryReader::new(b"GBX\x06\x00");
        assert!(reader.expect_magic(b"GBX").is_ok());

        let mut reader = BinaryReader::new(b"XML");
        assert!(matches!(
            reader.expect_magic(b"GBX"),
            Err(Error::InvalidMagic { .. })
        ));
    }
}
