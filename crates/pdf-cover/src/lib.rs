mod compose;
mod constants;
pub mod merge;
mod preview;
mod types;

pub use compose::{Placement, compose_cover_page, fit_image};
pub use merge::{load_pdf, merge, page_count};
pub use preview::{first_page_preview, shrink_to_fit};
pub use types::*;
