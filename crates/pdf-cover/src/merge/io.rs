//! Document I/O for merging

use crate::types::*;
use lopdf::Document;
use std::io::Write;
use std::path::Path;

/// Load a PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}

/// Number of pages in the PDF at `path`
pub async fn page_count(path: impl AsRef<Path>) -> Result<usize> {
    Ok(load_pdf(path).await?.get_pages().len())
}

/// Write `bytes` to `output_path` through a temporary sibling file.
///
/// The destination only ever sees the complete document; the temporary file
/// is removed if anything fails.
pub(crate) fn write_atomically(output_path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let write_failure = |source: std::io::Error| CoverError::WriteFailure {
        path: output_path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_failure)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".cover-")
        .suffix(".pdf.tmp")
        .tempfile_in(dir)
        .map_err(write_failure)?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(write_failure)?;

    // On failure the PersistError still owns the temp file and deletes it on drop
    tmp.persist(output_path)
        .map_err(|err| write_failure(err.error))?;
    Ok(())
}
