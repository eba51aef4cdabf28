use crate::types::*;
use std::path::{Path, PathBuf};

/// Map a user-entered destination token to a directory.
///
/// Accepts a literal directory path, any text containing a known
/// destination's directory or name, or a default-directory marker. The first
/// known destination that matches wins. `None` means the caller should ask
/// again.
pub fn resolve_destination(token: &str, known: &[Destination]) -> Option<PathBuf> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let literal = Path::new(token);
    if literal.is_dir() {
        return Some(literal.to_path_buf());
    }

    for destination in known {
        // The default directory is only reachable through its marker.
        if destination.kind == DestinationKind::DefaultDirectory {
            continue;
        }
        let directory = destination.directory.to_string_lossy();
        let name = destination.display_label.as_str();
        let dir_match = !directory.is_empty() && token.contains(directory.as_ref());
        let name_match = !name.is_empty() && token.contains(name);
        if dir_match || name_match {
            log::debug!(
                "Resolved '{}' to {} ({})",
                token,
                destination.directory.display(),
                destination.display_label
            );
            return Some(destination.directory.clone());
        }
    }

    if let Some(rest) = token.strip_prefix(DEFAULT_MARKER_PREFIX) {
        let directory = Path::new(rest.trim());
        if directory.is_dir() {
            return Some(directory.to_path_buf());
        }
    }

    None
}
