use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MARKER_PREFIX: &str = "Default:";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Destination directory not found: {0}")]
    DestinationNotFound(PathBuf),
    #[error("Not a plain file name: {0}")]
    InvalidFileName(String),
    #[error("Insufficient space on destination. Need {required} bytes, only {available} bytes available")]
    InsufficientSpace { required: u64, available: u64 },
    #[error("No write permission for: {}", .path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// A detected e-reader volume
    Device,
    /// The configured default export directory
    DefaultDirectory,
}

/// A directory a finished document can be copied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub display_label: String,
    pub directory: PathBuf,
    pub free_space_bytes: u64,
    pub kind: DestinationKind,
}

impl Destination {
    pub fn device(name: impl Into<String>, directory: impl Into<PathBuf>, free_space_bytes: u64) -> Self {
        Self {
            display_label: name.into(),
            directory: directory.into(),
            free_space_bytes,
            kind: DestinationKind::Device,
        }
    }

    pub fn default_directory(directory: impl Into<PathBuf>, free_space_bytes: u64) -> Self {
        Self {
            display_label: "Default".to_string(),
            directory: directory.into(),
            free_space_bytes,
            kind: DestinationKind::DefaultDirectory,
        }
    }

    pub fn free_space_mb(&self) -> f64 {
        self.free_space_bytes as f64 / BYTES_PER_MB
    }

    /// Text shown to the user; `resolve_destination` accepts it back.
    pub fn label(&self) -> String {
        match self.kind {
            DestinationKind::Device => format!(
                "{} — {} ({:.0} MB free)",
                self.display_label,
                self.directory.display(),
                self.free_space_mb()
            ),
            DestinationKind::DefaultDirectory => default_marker(&self.directory),
        }
    }
}

/// `"Default: <dir>"`
pub fn default_marker(directory: &Path) -> String {
    format!("{} {}", DEFAULT_MARKER_PREFIX, directory.display())
}
