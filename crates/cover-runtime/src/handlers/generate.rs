use crate::worker::WorkerContext;
use crate::CoverUpdate;
use cover_search::GenerationRequest;
use tokio::sync::mpsc;

pub async fn handle_generate(
    prompt: String,
    context: &WorkerContext,
    update_tx: &mpsc::UnboundedSender<CoverUpdate>,
) {
    let request = GenerationRequest {
        prompt,
        size: context.config.ai_size.clone(),
        quality: context.config.ai_quality.clone(),
    };

    match context.producer.produce(&request).await {
        Ok(image) => {
            let _ = update_tx.send(CoverUpdate::CoverGenerated { image });
        }
        Err(e) => {
            let _ = update_tx.send(CoverUpdate::Error {
                message: e.to_string(),
            });
        }
    }
}
