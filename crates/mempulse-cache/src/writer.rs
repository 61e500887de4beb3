//! Cache entry writer contract and plain writers.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while writing a cache entry
#[derive(Debug, Error)]
pub enum CacheEntryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Compression error: {0}")]
    Compression(String),
}

/// Serializes one build cache entry.
pub trait BuildCacheEntryWriter {
    /// Write the entry to `output`.
    ///
    /// The sink belongs to the caller; implementations must not assume they
    /// can close or seek it.
    fn write_to(&self, output: &mut dyn Write) -> Result<(), CacheEntryError>;
}

impl<W: BuildCacheEntryWriter + ?Sized> BuildCacheEntryWriter for &W {
    fn write_to(&self, output: &mut dyn Write) -> Result<(), CacheEntryError> {
        (**self).write_to(output)
    }
}

/// Writes an in-memory buffer verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesEntryWriter {
    bytes: Vec<u8>,
}

impl BytesEntryWriter {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Entry size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl BuildCacheEntryWriter for BytesEntryWriter {
    fn write_to(&self, output: &mut dyn Write) -> Result<(), CacheEntryError> {
        output.write_all(&self.bytes)?;
        Ok(())
    }
}

/// Streams a file's contents.
#[derive(Debug, Clone)]
pub struct FileEntryWriter {
    path: PathBuf,
}

impl FileEntryWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BuildCacheEntryWriter for FileEntryWriter {
    fn write_to(&self, output: &mut dyn Write) -> Result<(), CacheEntryError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let copied = io::copy(&mut reader, output)?;
        debug!("Wrote {} bytes from {}", copied, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that rejects every write.
    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bytes_writer() {
        let writer = BytesEntryWriter::new(b"cache entry".to_vec());
        let mut sink = Vec::new();

        writer.write_to(&mut sink).unwrap();
        assert_eq!(sink, b"cache entry");
        assert_eq!(writer.len(), 11);
    }

    #[test]
    fn test_sink_failure_propagates() {
        let writer = BytesEntryWriter::new("payload");
        let err = writer.write_to(&mut ClosedSink).unwrap_err();

        match err {
            CacheEntryError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_file_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.bin");
        std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();

        let mut sink = Vec::new();
        FileEntryWriter::new(&path).write_to(&mut sink).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileEntryWriter::new(dir.path().join("missing"));

        let err = writer.write_to(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, CacheEntryError::Io(_)));
    }
}
