mod deliver;
mod devices;
mod resolve;
mod space;
mod types;

pub use deliver::{deliver, deliver_with, required_space};
pub use devices::{DeviceLister, MountScanner, available_destinations, is_ereader_volume};
pub use resolve::resolve_destination;
pub use space::{DiskSpace, SpaceProbe};
pub use types::*;
