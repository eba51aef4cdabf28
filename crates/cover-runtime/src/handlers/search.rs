use crate::worker::WorkerContext;
use crate::CoverUpdate;
use cover_search::SearchCandidate;
use tokio::sync::mpsc;

pub async fn handle_search(
    query: String,
    max_results: usize,
    context: &WorkerContext,
    update_tx: &mpsc::UnboundedSender<CoverUpdate>,
) {
    let _ = update_tx.send(CoverUpdate::Progress {
        operation: format!("Searching covers for '{query}'"),
        current: 0,
        total: 2,
    });
    let candidates = context.aggregator.search(&query, max_results).await;

    let _ = update_tx.send(CoverUpdate::Progress {
        operation: format!("Downloading {} thumbnails", candidates.len()),
        current: 1,
        total: 2,
    });
    let candidates = cover_search::materialize_thumbnails(
        &context.client,
        candidates,
        context.config.thumbnail_size(),
        context.config.max_concurrent_downloads,
    )
    .await;

    let _ = update_tx.send(CoverUpdate::CandidatesFound { query, candidates });
}

pub async fn handle_fetch_full_image(
    candidate: SearchCandidate,
    context: &WorkerContext,
    update_tx: &mpsc::UnboundedSender<CoverUpdate>,
) {
    match cover_search::fetch_full_image(&context.client, &candidate).await {
        Ok(image) => {
            let _ = update_tx.send(CoverUpdate::FullImageReady { candidate, image });
        }
        Err(e) => {
            let _ = update_tx.send(CoverUpdate::Error {
                message: format!("Failed to download cover for '{}': {e}", candidate.title),
            });
        }
    }
}
