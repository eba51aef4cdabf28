//! Copying a finished document to its destination
//!
//! Checks run in a fixed order so the most actionable problem is reported:
//! source exists, destination exists, enough space, writable, then copy.

use crate::space::{DiskSpace, SpaceProbe};
use crate::types::*;
use std::ffi::OsStr;
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};

/// Bytes the destination must have free to accept a `size`-byte file:
/// the size plus a 10% margin.
pub fn required_space(size: u64) -> u64 {
    size + size.div_ceil(10)
}

/// Copy `source` into `destination_dir`, under `filename_override` if given.
///
/// Returns the path of the copy.
pub async fn deliver(
    source: impl Into<PathBuf>,
    destination_dir: impl Into<PathBuf>,
    filename_override: Option<String>,
) -> Result<PathBuf> {
    let source = source.into();
    let destination_dir = destination_dir.into();
    tokio::task::spawn_blocking(move || {
        deliver_with(&DiskSpace, &source, &destination_dir, filename_override.as_deref())
    })
    .await?
}

/// [`deliver`] with an explicit free-space source.
pub fn deliver_with(
    probe: &impl SpaceProbe,
    source: &Path,
    destination_dir: &Path,
    filename_override: Option<&str>,
) -> Result<PathBuf> {
    let source = std::path::absolute(source)?;
    if !source.is_file() {
        return Err(DeliveryError::SourceNotFound(source));
    }
    if !destination_dir.is_dir() {
        return Err(DeliveryError::DestinationNotFound(destination_dir.to_path_buf()));
    }

    let size = fs::metadata(&source)?.len();
    let required = required_space(size);
    let available = probe.available_space(destination_dir)?;
    if available < required {
        return Err(DeliveryError::InsufficientSpace {
            required,
            available,
        });
    }

    check_writable(destination_dir)?;

    let file_name = match filename_override {
        Some(name) => {
            // Only a bare name keeps the copy inside `destination_dir`
            if Path::new(name).file_name() != Some(OsStr::new(name)) {
                return Err(DeliveryError::InvalidFileName(name.to_string()));
            }
            name.into()
        }
        None => source
            .file_name()
            .ok_or_else(|| DeliveryError::SourceNotFound(source.clone()))?
            .to_os_string(),
    };
    let dest_path = destination_dir.join(file_name);

    if same_file(&source, &dest_path) {
        log::info!("'{}' is already at its destination", source.display());
        return Ok(dest_path);
    }

    match copy_preserving_times(&source, &dest_path) {
        Ok(()) => {
            log::info!("Exported '{}' -> '{}'", source.display(), dest_path.display());
            Ok(dest_path)
        }
        Err(e) => {
            log::error!("Export failed: {}", e);
            Err(e.into())
        }
    }
}

/// A probe file that can be created (and is removed on drop) proves the
/// directory is writable.
fn check_writable(directory: &Path) -> Result<()> {
    tempfile::Builder::new()
        .prefix(".coverj-write-check")
        .tempfile_in(directory)
        .map(drop)
        .map_err(|source| DeliveryError::Permission {
            path: directory.to_path_buf(),
            source,
        })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy contents and permissions, then carry over access and modification times.
fn copy_preserving_times(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::copy(source, dest)?;

    let meta = fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    // A read-only copy can still take new times from its owner
    let file = File::options()
        .write(true)
        .open(dest)
        .or_else(|_| File::open(dest))?;
    file.set_times(times)
}
