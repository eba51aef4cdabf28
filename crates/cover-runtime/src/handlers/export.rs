use crate::worker::WorkerContext;
use crate::CoverUpdate;
use cover_search::RasterImage;
use pdf_cover::MergeRequest;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Size of the first-page preview shown next to the chosen cover
const PREVIEW_SIZE: (u32, u32) = (300, 420);

pub async fn handle_preview(
    path: PathBuf,
    update_tx: &mpsc::UnboundedSender<CoverUpdate>,
) {
    let image = pdf_cover::first_page_preview(&path, PREVIEW_SIZE).await;
    let _ = update_tx.send(CoverUpdate::FirstPagePreview { path, image });
}

pub async fn handle_list_destinations(
    context: &WorkerContext,
    update_tx: &mpsc::UnboundedSender<CoverUpdate>,
) {
    let devices = context.devices.clone();
    let default_dir = context.config.default_export_directory.clone();

    let listed = tokio::task::spawn_blocking(move || {
        cover_delivery::available_destinations(devices.as_ref(), default_dir.as_deref())
    })
    .await;

    match listed {
        Ok(destinations) => {
            let _ = update_tx.send(CoverUpdate::DestinationsListed { destinations });
        }
        Err(e) => {
            let _ = update_tx.send(CoverUpdate::Error {
                message: format!("Failed to list destinations: {e}"),
            });
        }
    }
}

/// Inject the cover into each source and deliver it under its original name.
///
/// A failing document is recorded and the rest of the batch carries on.
/// A later source sharing an earlier one's file name is recorded as failed.
pub async fn handle_inject_batch(
    sources: Vec<PathBuf>,
    cover: RasterImage,
    destination: PathBuf,
    drop_original_first_page: bool,
    context: &WorkerContext,
    update_tx: &mpsc::UnboundedSender<CoverUpdate>,
) {
    let work_dir = match tempfile::Builder::new().prefix("coverj_").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            let _ = update_tx.send(CoverUpdate::Error {
                message: format!("Failed to create working directory: {e}"),
            });
            return;
        }
    };

    let total = sources.len();
    let mut exported = Vec::new();
    let mut failures = Vec::new();
    let mut names = HashSet::new();

    for (i, source) in sources.iter().enumerate() {
        let name = display_name(source);
        let _ = update_tx.send(CoverUpdate::Progress {
            operation: format!("Processing {}/{}: {}", i + 1, total, name),
            current: i,
            total,
        });

        // Every document lands in the same directory under its own name
        if !names.insert(name.clone()) {
            let message = format!("Another document named '{name}' is already in this batch");
            log::error!("Skipping {}: {}", source.display(), message);
            failures.push((name, message));
            continue;
        }

        let request = MergeRequest {
            source_document_path: source.clone(),
            cover_image: cover.clone(),
            output_path: work_dir.path().join(format!("cover_{name}")),
            page_geometry_name: context.config.cover_page_size.clone(),
            resolution_hint: context.config.cover_dpi,
            drop_original_first_page,
        };

        match inject_and_deliver(request, &destination, &name).await {
            Ok(path) => exported.push(path),
            Err(message) => {
                log::error!("Error processing {}: {}", source.display(), message);
                failures.push((name, message));
            }
        }
    }

    let _ = update_tx.send(CoverUpdate::Progress {
        operation: format!(
            "Done: {} exported, {} error(s)",
            exported.len(),
            failures.len()
        ),
        current: total,
        total,
    });
    let _ = update_tx.send(CoverUpdate::BatchComplete { exported, failures });
}

async fn inject_and_deliver(
    request: MergeRequest,
    destination: &Path,
    name: &str,
) -> Result<PathBuf, String> {
    let merged = pdf_cover::merge(request).await.map_err(|e| e.to_string())?;
    cover_delivery::deliver(merged, destination, Some(name.to_string()))
        .await
        .map_err(|e| e.to_string())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
