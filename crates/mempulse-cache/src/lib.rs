//! mempulse Build Cache Entries
//!
//! Serialization boundary for build cache entries. A `BuildCacheEntryWriter`
//! knows how to put one entry's bytes into a caller-owned sink; the sink
//! stays open and writable for the duration of the call and any failure
//! comes back as an error.
//!
//! Provided writers:
//! - `BytesEntryWriter`: an in-memory buffer
//! - `FileEntryWriter`: a file on disk, streamed
//! - `CompressedEntryWriter`: Zstd-compresses another writer's output

mod compress;
mod store;
mod writer;

pub use compress::{CompressedEntryWriter, DEFAULT_COMPRESSION_LEVEL};
pub use store::write_entry_to_path;
pub use writer::{BuildCacheEntryWriter, BytesEntryWriter, CacheEntryError, FileEntryWriter};
