use crate::config::{AppConfig, Secrets};
use crate::handlers;
use crate::{CoverCommand, CoverUpdate};
use cover_delivery::{DeviceLister, MountScanner};
use cover_search::{CandidateAggregator, FetchError, ImageProducer, OpenAiImageProducer};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a command handler needs, shared by all in-flight commands
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Arc<AppConfig>,
    pub client: reqwest::Client,
    pub aggregator: Arc<CandidateAggregator>,
    pub producer: Arc<dyn ImageProducer>,
    pub devices: Arc<dyn DeviceLister + Send + Sync>,
}

impl WorkerContext {
    /// Wire up the real backends, image producer and device scanner.
    pub fn from_config(config: AppConfig, secrets: Secrets) -> Result<Self, FetchError> {
        let client = cover_search::http_client()?;
        let aggregator =
            CandidateAggregator::with_default_backends(client.clone(), secrets.google_books_api_key);
        let producer = OpenAiImageProducer::new(
            client.clone(),
            secrets.openai_api_key,
            config.ai_model.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            aggregator: Arc::new(aggregator),
            producer: Arc::new(producer),
            devices: Arc::new(MountScanner::for_current_platform()),
        })
    }
}

/// Start the worker on the current runtime.
///
/// Returns the command sender and the update receiver. The worker stops once
/// every command sender is dropped.
pub fn spawn_worker(
    context: WorkerContext,
) -> (
    mpsc::UnboundedSender<CoverCommand>,
    mpsc::UnboundedReceiver<CoverUpdate>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    tokio::spawn(worker_task(command_rx, update_tx, context));
    (command_tx, update_rx)
}

/// Async worker task that runs each command on its own task and forwards updates
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<CoverCommand>,
    update_tx: mpsc::UnboundedSender<CoverUpdate>,
    context: WorkerContext,
) {
    while let Some(cmd) = command_rx.recv().await {
        tokio::spawn(process_command(cmd, context.clone(), update_tx.clone()));
    }
}

async fn process_command(
    cmd: CoverCommand,
    context: WorkerContext,
    update_tx: mpsc::UnboundedSender<CoverUpdate>,
) {
    match cmd {
        CoverCommand::SearchCovers { query, max_results } => {
            handlers::search::handle_search(query, max_results, &context, &update_tx).await;
        }
        CoverCommand::FetchFullImage { candidate } => {
            handlers::search::handle_fetch_full_image(candidate, &context, &update_tx).await;
        }
        CoverCommand::GenerateCover { prompt } => {
            handlers::generate::handle_generate(prompt, &context, &update_tx).await;
        }
        CoverCommand::PreviewFirstPage { path } => {
            handlers::export::handle_preview(path, &update_tx).await;
        }
        CoverCommand::ListDestinations => {
            handlers::export::handle_list_destinations(&context, &update_tx).await;
        }
        CoverCommand::InjectBatch {
            sources,
            cover,
            destination,
            drop_original_first_page,
        } => {
            handlers::export::handle_inject_batch(
                sources,
                cover,
                destination,
                drop_original_first_page,
                &context,
                &update_tx,
            )
            .await;
        }
    }
}
