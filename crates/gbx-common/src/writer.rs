//! Binary writer producing little-endian GBX byte streams.

use byteorder::{LittleEndian, WriteBytesExt};
use zerocopy::{Immutable, IntoBytes};

use crate::{Error, Result};

/// A growable little-endian writer.
///
/// Mirrors [`BinaryReader`](crate::BinaryReader): 32-bit booleans and
/// `u32` length-prefixed strings. Sizes that are only known after a section
/// has been written are filled in with [`BinaryWriter::patch_u32`].
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a pre-allocated buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Current write position (the number of bytes written so far).
    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// View the bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes written since `start`.
    #[inline]
    pub fn written_since(&self, start: usize) -> &[u8] {
        &self.buffer[start.min(self.buffer.len())..]
    }

    /// Consume the writer and return the buffer.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buffer.write_u8(value)?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.buffer.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buffer.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buffer.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.buffer.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a 32-bit boolean.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u32(u32::from(value))
    }

    /// Write a length prefix, rejecting lengths that overflow `u32`.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::LengthOverflow(len))?;
        self.write_u32(len)
    }

    /// Write a `u32` length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_len(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Write a `u32` length-prefixed byte blob.
    pub fn write_data(&mut self, value: &[u8]) -> Result<()> {
        self.write_len(value.len())?;
        self.write_bytes(value);
        Ok(())
    }

    /// Write a zerocopy struct verbatim.
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) {
        self.buffer.extend_from_slice(value.as_bytes());
    }

    /// Reserve a `u32` slot to be patched later and return its offset.
    pub fn reserve_u32(&mut self) -> usize {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(&[0; 4]);
        offset
    }

    /// Overwrite a previously reserved `u32` slot.
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let len = self.buffer.len();
        let slot = self
            .buffer
            .get_mut(offset..offset + 4)
            .ok_or(Error::PatchOutOfBounds { offset, len })?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryReader;

    #[test]
    fn test_write_then_read_back() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(0xFACADE01).unwrap();
        writer.write_string("Stadium").unwrap();
        writer.write_bool(true).unwrap();
        writer.write_f32(1.0).unwrap();

        let bytes = writer.into_bytes();
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_u32().unwrap(), 0xFACADE01);
        assert_eq!(reader.read_string().unwrap(), "Stadium");
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_f32().unwrap(), 1.0);
    }

    #[test]
    fn test_patch_reserved_slot() {
        let mut writer = BinaryWriter::new();
        let slot = writer.reserve_u32();
        writer.write_bytes(b"payload");
        let size = (writer.position() - slot - 4) as u32;
        writer.patch_u32(slot, size).unwrap();

        assert_eq!(&writer.as_bytes()[..4], &7u32.to_le_bytes());
    }

    #[test]
    fn test_patch_out_of_bounds() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(1).unwrap();
        assert!(matches!(
            writer.patch_u32(0, 5),
            Err(Error::PatchOutOfBounds { offset: 0, len: 1 })
        ));
    }
}
