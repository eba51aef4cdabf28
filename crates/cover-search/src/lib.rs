mod aggregate;
mod backend;
mod generate;
mod query;
mod thumbnails;
mod types;

pub use aggregate::{CandidateAggregator, merge_candidates};
pub use backend::{
    GOOGLE_BOOKS_URL, OPEN_LIBRARY_COVER_URL, OPEN_LIBRARY_SEARCH_URL, SearchBackend,
    parse_google_books, parse_open_library,
};
pub use generate::{
    GenerationError, GenerationRequest, ImageProducer, OPENAI_IMAGES_URL, OpenAiImageProducer,
    build_default_prompt,
};
pub use query::derive_query;
pub use thumbnails::{
    REQUEST_TIMEOUT, download_image, fetch_full_image, http_client, materialize_thumbnails,
};
pub use types::*;
