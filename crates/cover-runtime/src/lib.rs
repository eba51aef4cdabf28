use std::path::PathBuf;

mod config;
mod handlers;
mod worker;

pub use config::{AppConfig, Secrets};
pub use worker::{WorkerContext, spawn_worker, worker_task};

// Re-export types from library crates
pub use cover_delivery::{Destination, DeviceLister};
pub use cover_search::{ImageProducer, RasterImage, SearchCandidate};

/// Commands sent from the controller to the worker
#[derive(Debug)]
pub enum CoverCommand {
    SearchCovers {
        query: String,
        max_results: usize,
    },
    /// Download the chosen candidate's full resolution image
    FetchFullImage {
        candidate: SearchCandidate,
    },
    GenerateCover {
        prompt: String,
    },
    PreviewFirstPage {
        path: PathBuf,
    },
    ListDestinations,
    /// Put `cover` in front of every source and copy the results to `destination`
    InjectBatch {
        sources: Vec<PathBuf>,
        cover: RasterImage,
        destination: PathBuf,
        drop_original_first_page: bool,
    },
}

/// Updates sent from the worker to the controller
#[derive(Debug, Clone)]
pub enum CoverUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    CandidatesFound {
        query: String,
        candidates: Vec<SearchCandidate>,
    },
    FullImageReady {
        candidate: SearchCandidate,
        image: RasterImage,
    },
    CoverGenerated {
        image: RasterImage,
    },
    FirstPagePreview {
        path: PathBuf,
        image: Option<RasterImage>,
    },
    DestinationsListed {
        destinations: Vec<Destination>,
    },
    BatchComplete {
        exported: Vec<PathBuf>,
        /// (file name, message) for every document that failed
        failures: Vec<(String, String)>,
    },
    Error {
        message: String,
    },
}
