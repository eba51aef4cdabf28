use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Decoded bitmap, always normalized to 8-bit RGB
pub type RasterImage = image::RgbImage;

/// One cover found by a search backend
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub title: String,
    pub author: String,
    pub thumbnail_url: String,
    /// Only downloaded once the candidate is chosen
    pub full_resolution_url: String,
    pub source_name: String,
    pub thumbnail_image: Option<RasterImage>,
}

impl SearchCandidate {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        thumbnail_url: impl Into<String>,
        full_resolution_url: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            thumbnail_url: thumbnail_url.into(),
            full_resolution_url: full_resolution_url.into(),
            source_name: source_name.into(),
            thumbnail_image: None,
        }
    }

    /// Identity used to drop duplicates across backends
    pub fn dedup_key(&self) -> String {
        self.title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
