//! Atomic entry files.

use crate::writer::{BuildCacheEntryWriter, CacheEntryError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Write an entry to `path` through a temp file and rename.
///
/// Readers never observe a partially written entry. Returns the entry
/// size on disk in bytes.
pub fn write_entry_to_path<W>(writer: &W, path: &Path) -> Result<u64, CacheEntryError>
where
    W: BuildCacheEntryWriter + ?Sized,
{
    let temp_path = path.with_extension("tmp");

    let result = write_temp(writer, &temp_path).and_then(|()| {
        fs::rename(&temp_path, path)?;
        Ok(fs::metadata(path)?.len())
    });

    match result {
        Ok(size) => {
            debug!("Wrote cache entry {} ({} bytes)", path.display(), size);
            Ok(size)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", temp_path.display(), cleanup);
                }
            }
            Err(e)
        }
    }
}

fn write_temp<W>(writer: &W, temp_path: &Path) -> Result<(), CacheEntryError>
where
    W: BuildCacheEntryWriter + ?Sized,
{
    let file = File::create(temp_path)?;
    let mut out = BufWriter::new(file);
    writer.write_to(&mut out)?;
    out.flush()?;
    out.get_ref().sync_all()?;
    Ok(())
}
