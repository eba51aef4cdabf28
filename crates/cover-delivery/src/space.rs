use std::io;
use std::path::Path;

/// Reports how many bytes can still be written under a directory
pub trait SpaceProbe {
    fn available_space(&self, directory: &Path) -> io::Result<u64>;
}

/// Asks the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSpace;

impl SpaceProbe for DiskSpace {
    fn available_space(&self, directory: &Path) -> io::Result<u64> {
        fs2::available_space(directory)
    }
}
