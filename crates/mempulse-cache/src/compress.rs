//! Zstd-compressed cache entries.

use crate::writer::{BuildCacheEntryWriter, CacheEntryError};
use std::io::Write;
use tracing::debug;
use zstd::stream::Encoder;

/// Compression level for Zstd (1-22, higher = better compression, slower)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Wraps another writer and compresses everything it writes.
#[derive(Debug, Clone)]
pub struct CompressedEntryWriter<W> {
    inner: W,
    level: i32,
}

impl<W: BuildCacheEntryWriter> CompressedEntryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_level(inner, DEFAULT_COMPRESSION_LEVEL)
    }

    pub fn with_level(inner: W, level: i32) -> Self {
        Self { inner, level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: BuildCacheEntryWriter> BuildCacheEntryWriter for CompressedEntryWriter<W> {
    fn write_to(&self, output: &mut dyn Write) -> Result<(), CacheEntryError> {
        let mut encoder = Encoder::new(output, self.level)
            .map_err(|e| CacheEntryError::Compression(e.to_string()))?;

        self.inner.write_to(&mut encoder)?;

        encoder
            .finish()
            .map_err(|e| CacheEntryError::Compression(e.to_string()))?;

        debug!(level = self.level, "Compressed cache entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BytesEntryWriter;

    #[test]
    fn test_compressed_output_decodes() {
        let payload = b"memory status ".repeat(64);
        let writer = CompressedEntryWriter::new(BytesEntryWriter::new(payload.clone()));

        let mut sink = Vec::new();
        writer.write_to(&mut sink).unwrap();

        assert_eq!(zstd::decode_all(sink.as_slice()).unwrap(), payload);
    }

    #[test]
    fn test_compression_ratio() {
        // Repetitive data should compress significantly
        let writer = CompressedEntryWriter::with_level(BytesEntryWriter::new(vec![0u8; 100_000]), 1);

        let mut sink = Vec::new();
        writer.write_to(&mut sink).unwrap();

        assert!(sink.len() < 50_000, "Compression ratio too low");
        assert_eq!(writer.level(), 1);
    }
}
