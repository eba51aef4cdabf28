use crate::constants::mm_to_pt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Source document not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Invalid cover image: {0}")]
    InvalidImage(String),
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CoverError>;

/// Decoded cover bitmap, always normalized to 8-bit RGB
pub type RasterImage = image::RgbImage;

/// Named page sizes a cover page can be composed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageGeometry {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PageGeometry {
    pub const ALL: [PageGeometry; 6] = [
        PageGeometry::A3,
        PageGeometry::A4,
        PageGeometry::A5,
        PageGeometry::Letter,
        PageGeometry::Legal,
        PageGeometry::Tabloid,
    ];

    /// Portrait dimensions (width, height) in millimeters
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageGeometry::A3 => (297.0, 420.0),
            PageGeometry::A4 => (210.0, 297.0),
            PageGeometry::A5 => (148.0, 210.0),
            PageGeometry::Letter => (215.9, 279.4),
            PageGeometry::Legal => (215.9, 355.6),
            PageGeometry::Tabloid => (279.4, 431.8),
        }
    }

    /// Portrait dimensions (width, height) in points
    pub fn dimensions_pt(self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (mm_to_pt(w), mm_to_pt(h))
    }

    pub fn name(self) -> &'static str {
        match self {
            PageGeometry::A3 => "A3",
            PageGeometry::A4 => "A4",
            PageGeometry::A5 => "A5",
            PageGeometry::Letter => "LETTER",
            PageGeometry::Legal => "LEGAL",
            PageGeometry::Tabloid => "TABLOID",
        }
    }

    /// Look up a geometry by name, ignoring case
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoverError::Config(format!("Unknown page size: {name:?}")))
    }
}

impl FromStr for PageGeometry {
    type Err = CoverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Everything needed to put a new cover on one document
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub source_document_path: PathBuf,
    pub cover_image: RasterImage,
    pub output_path: PathBuf,
    pub page_geometry_name: String,
    /// Dots per inch recorded on the embedded cover image
    pub resolution_hint: u16,
    /// Skip the source's first page (ignored for single-page sources)
    pub drop_original_first_page: bool,
}
