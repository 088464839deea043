//! Body compression.
//!
//! Compressed bodies are stored as `uncompressed_size: u32`,
//! `compressed_size: u32`, then a zlib stream.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::{Error, Result};

pub(crate) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::Compression(e.to_string()))
}

/// Upper bound on the zlib expansion ratio used to size the output buffer.
const MAX_RATIO: usize = 1032;

pub(crate) fn decompress(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let capacity = uncompressed_size.min(data.len().saturating_mul(MAX_RATIO));
    let mut decompressed = Vec::with_capacity(capacity);
    // one byte past the declared size is enough to detect a mismatch
    ZlibDecoder::new(data)
        .take(uncompressed_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    if decompressed.len() != uncompressed_size {
        return Err(Error::SizeMismatch {
            section: "decompressed body",
            expected: uncompressed_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress() {
        let data = b"\x01\xDE\xCA\xFA".repeat(64);
        let packed = compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_size_mismatch() {
        let packed = compress(b"abc").unwrap();
        assert!(matches!(
            decompress(&packed, 4),
            Err(Error::SizeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_huge_declared_size() {
        let packed = compress(b"abc").unwrap();
        assert!(matches!(
            decompress(&packed, usize::MAX / 2),
            Err(Error::SizeMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn test_output_stops_past_declared_size() {
        let packed = compress(&[0u8; 4096]).unwrap();
        assert!(matches!(
            decompress(&packed, 16),
            Err(Error::SizeMismatch { expected: 16, actual: 17, .. })
        ));
    }

    #[test]
    fn test_garbage_input() {
        assert!(matches!(
            decompress(b"not zlib", 8),
            Err(Error::Decompression(_))
        ));
    }
}
