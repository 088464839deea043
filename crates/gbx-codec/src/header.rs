//! GBX file header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use gbx_common::{BinaryReader, BinaryWriter};

use crate::{Error, Result};

/// Magic bytes at the start of every GBX file.
pub const GBX_MAGIC: &[u8; 3] = b"GBX";

/// The only container version this crate reads and writes.
pub const SUPPORTED_VERSION: u16 = 6;

/// Compression flag of a header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Uncompressed,
    Compressed,
}

impl Compression {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'U' => Ok(Compression::Uncompressed),
            b'C' => Ok(Compression::Compressed),
            other => Err(Error::InvalidFormat(other)),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Compression::Uncompressed => b'U',
            Compression::Compressed => b'C',
        }
    }
}

/// The four format bytes following the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub ref_table_compression: Compression,
    pub body_compression: Compression,
    /// `R` or `E`; carried through unchanged.
    pub trailer: u8,
}

/// On-disk entry of the header chunk table.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct HeaderChunkEntry {
    pub chunk_id: u32,
    /// Payload size; the top bit flags a "heavy" chunk.
    pub size: u32,
}

impl HeaderChunkEntry {
    pub const HEAVY_BIT: u32 = 0x8000_0000;
}

/// A header ("user data") chunk, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderChunk {
    pub chunk_id: u32,
    pub heavy: bool,
    pub data: Vec<u8>,
}

/// Decoded file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub format: Format,
    pub class_id: u32,
    pub chunks: Vec<HeaderChunk>,
    /// Size of this file's node pool, including the body at index 0.
    pub num_nodes: u32,
}

impl Header {
    /// Header for a freshly built file.
    pub fn new(class_id: u32, num_nodes: u32) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            format: Format {
                ref_table_compression: Compression::Uncompressed,
                body_compression: Compression::Compressed,
                trailer: b'R',
            },
            class_id,
            chunks: Vec::new(),
            num_nodes,
        }
    }

    pub(crate) fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.expect_magic(GBX_MAGIC)?;

        let version = reader.read_u16()?;
        if version != SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let [kind, ref_table, body, trailer] = reader.read_array::<4>()?;
        if kind != b'B' {
            return Err(Error::InvalidFormat(kind));
        }
        let format = Format {
            ref_table_compression: Compression::from_byte(ref_table)?,
            body_compression: Compression::from_byte(body)?,
            trailer,
        };

        let class_id = reader.read_u32()?;

        let user_data_size = reader.read_u32()? as usize;
        let mut chunks = Vec::new();
        if user_data_size > 0 {
            let start = reader.position();
            let count = reader.read_u32()?;
            let mut entries = Vec::with_capacity((count as usize).min(reader.remaining() / 8));
            for _ in 0..count {
                entries.push(reader.read_struct::<HeaderChunkEntry>()?);
            }
            for entry in entries {
                let size = entry.size & !HeaderChunkEntry::HEAVY_BIT;
                chunks.push(HeaderChunk {
                    chunk_id: entry.chunk_id,
                    heavy: entry.size & HeaderChunkEntry::HEAVY_BIT != 0,
                    data: reader.read_bytes(size as usize)?.to_vec(),
                });
            }
            let consumed = reader.position() - start;
            if consumed != user_data_size {
                return Err(Error::SizeMismatch {
                    section: "user data",
                    expected: user_data_size,
                    actual: consumed,
                });
            }
        }

        let num_nodes = reader.read_u32()?;

        Ok(Self {
            version,
            format,
            class_id,
            chunks,
            num_nodes,
        })
    }

    pub(crate) fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_bytes(GBX_MAGIC);
        writer.write_u16(self.version)?;
        writer.write_bytes(&[
            b'B',
            self.format.ref_table_compression.to_byte(),
            self.format.body_compression.to_byte(),
            self.format.trailer,
        ]);
        writer.write_u32(self.class_id)?;

        if self.chunks.is_empty() {
            writer.write_u32(0)?;
        } else {
            let size_slot = writer.reserve_u32();
            let start = writer.position();
            writer.write_len(self.chunks.len())?;
            for chunk in &self.chunks {
                let size = u32::try_from(chunk.data.len())
                    .ok()
                    .filter(|size| size & HeaderChunkEntry::HEAVY_BIT == 0)
                    .ok_or(gbx_common::Error::LengthOverflow(chunk.data.len()))?;
                let flag = if chunk.heavy {
                    HeaderChunkEntry::HEAVY_BIT
                } else {
                    0
                };
                writer.write_struct(&HeaderChunkEntry {
                    chunk_id: chunk.chunk_id,
                    size: size | flag,
                });
            }
            for chunk in &self.chunks {
                writer.write_bytes(&chunk.data);
            }
            let size = writer.position() - start;
            writer.patch_u32(size_slot, size as u32)?;
        }

        writer.write_u32(self.num_nodes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip_with_user_data() {
        let mut header = Header::new(0x2E00_2000, 5);
        header.chunks.push(HeaderChunk {
            chunk_id: 0x2E00_1003,
            heavy: false,
            data: vec![1, 2, 3],
        });
        header.chunks.push(HeaderChunk {
            chunk_id: 0x2E00_1004,
            heavy: true,
            data: vec![4; 10],
        });

        let mut writer = BinaryWriter::new();
        header.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(Header::read(&mut reader).unwrap(), header);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut writer = BinaryWriter::new();
        let mut header = Header::new(0, 1);
        header.version = 3;
        header.write(&mut writer).unwrap();

        let bytes = writer.into_bytes();
        let result = Header::read(&mut BinaryReader::new(&bytes));
        assert!(matches!(result, Err(Error::UnsupportedVersion(3))));
    }

    #[test]
    fn test_rejects_text_format() {
        let bytes = b"GBX\x06\x00TUUR";
        let result = Header::read(&mut BinaryReader::new(bytes));
        assert!(matches!(result, Err(Error::InvalidFormat(b'T'))));
    }

    #[test]
    fn test_chunk_count_larger_than_data() {
        let mut bytes = b"GBX\x06\x00BUCR".to_vec();
        for word in [0x2E00_2000u32, 8, u32::MAX, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let result = Header::read(&mut BinaryReader::new(&bytes));
        assert!(matches!(
            result,
            Err(Error::Common(gbx_common::Error::UnexpectedEof { .. }))
        ));
    }
}
