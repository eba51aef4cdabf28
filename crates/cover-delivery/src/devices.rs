//! Finding mounted e-readers

use crate::space::{DiskSpace, SpaceProbe};
use crate::types::*;
use std::path::{Path, PathBuf};

/// Volume-name fragments that identify an e-reader, matched case-insensitively
const EREADER_PATTERNS: [&str; 8] = [
    "kindle",
    "kobo",
    "pocketbook",
    "nook",
    "tolino",
    "onyx",
    "boox",
    "remarkable",
];

/// Subdirectories e-readers keep documents in, in order of preference
const DOCUMENT_DIRS: [&str; 6] = ["documents", "Documents", "Books", "books", "eBooks", "ebooks"];

/// Source of detected device destinations
pub trait DeviceLister {
    /// Never fails; problems yield fewer entries.
    fn list(&self) -> Vec<Destination>;
}

/// Looks for e-reader volumes directly under a set of mount directories,
/// and on Windows among the drive letters.
#[derive(Debug, Clone)]
pub struct MountScanner {
    mount_dirs: Vec<PathBuf>,
    drive_roots: Vec<PathBuf>,
}

impl MountScanner {
    /// Scan the given directories' immediate children.
    pub fn new(mount_dirs: Vec<PathBuf>) -> Self {
        Self {
            mount_dirs,
            drive_roots: Vec::new(),
        }
    }

    /// `/Volumes` on macOS; `/media/<user>` and `/mnt` on Linux; drives
    /// `D:` to `Z:` on Windows.
    pub fn for_current_platform() -> Self {
        if cfg!(windows) {
            let drive_roots = ('D'..='Z')
                .map(|letter| PathBuf::from(format!("{letter}:\\")))
                .filter(|root| root.is_dir())
                .collect();
            return Self {
                mount_dirs: Vec::new(),
                drive_roots,
            };
        }

        let mount_dirs = if cfg!(target_os = "macos") {
            vec![PathBuf::from("/Volumes")]
        } else if cfg!(target_os = "linux") {
            let mut dirs = subdirectories(Path::new("/media"));
            dirs.push(PathBuf::from("/mnt"));
            dirs
        } else {
            log::warn!("Device detection is not supported on this platform");
            Vec::new()
        };
        Self::new(mount_dirs)
    }

    /// `(name, root)` of every volume worth checking.
    fn volumes(&self) -> Vec<(String, PathBuf)> {
        let mounted = self
            .mount_dirs
            .iter()
            .flat_map(|dir| subdirectories(dir))
            .filter_map(|volume| {
                let name = volume.file_name()?.to_string_lossy().into_owned();
                Some((name, volume))
            });
        let drives = self.drive_roots.iter().map(|root| {
            let letter = root.to_string_lossy().trim_end_matches('\\').to_string();
            let name = volume_label(&letter).unwrap_or(letter);
            (name, root.clone())
        });
        mounted.chain(drives).collect()
    }

    fn scan(&self, probe: &impl SpaceProbe) -> Vec<Destination> {
        let mut devices = Vec::new();
        for (name, volume) in self.volumes() {
            if !is_ereader_volume(&name) {
                continue;
            }

            let documents = documents_dir(&volume);
            let free = probe.available_space(&volume).unwrap_or_else(|e| {
                log::warn!("Could not read free space of {}: {}", volume.display(), e);
                0
            });
            log::info!("Detected ebook reader: {} at {}", name, volume.display());
            devices.push(Destination::device(name, documents, free));
        }
        devices
    }
}

impl DeviceLister for MountScanner {
    fn list(&self) -> Vec<Destination> {
        self.scan(&DiskSpace)
    }
}

/// Whether a volume name looks like an e-reader.
pub fn is_ereader_volume(name: &str) -> bool {
    let lower = name.to_lowercase();
    EREADER_PATTERNS.iter().any(|p| lower.contains(p)) || is_sony_reader(&lower)
}

/// "sonyreader", "sony reader", "sony_reader", ...
fn is_sony_reader(lower: &str) -> bool {
    lower.match_indices("sony").any(|(i, _)| {
        let rest = &lower[i + "sony".len()..];
        rest.starts_with("reader")
            || rest
                .char_indices()
                .nth(1)
                .is_some_and(|(j, _)| rest[j..].starts_with("reader"))
    })
}

/// Label of a Windows drive such as `"E:"`, read from `vol`.
#[cfg(windows)]
fn volume_label(drive: &str) -> Option<String> {
    let output = std::process::Command::new("cmd")
        .args(["/C", "vol", drive])
        .output()
        .map_err(|e| log::warn!("Could not read the label of {}: {}", drive, e))
        .ok()?;
    parse_vol_label(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(windows))]
fn volume_label(_drive: &str) -> Option<String> {
    None
}

/// Pull the label out of `vol` output: `" Volume in drive E is KINDLE"`.
/// Unlabelled drives report `"has no label"` and give `None`.
#[cfg_attr(not(windows), allow(dead_code))]
fn parse_vol_label(output: &str) -> Option<String> {
    let first = output.lines().find(|line| !line.trim().is_empty())?;
    let (_, label) = first.split_once(" is ")?;
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn documents_dir(volume: &Path) -> PathBuf {
    DOCUMENT_DIRS
        .iter()
        .map(|d| volume.join(d))
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| volume.to_path_buf())
}

/// Sorted child directories; unreadable directories yield nothing.
fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Detected devices followed by the default export directory, if it exists.
pub fn available_destinations(
    lister: &dyn DeviceLister,
    default_dir: Option<&Path>,
) -> Vec<Destination> {
    let mut destinations = lister.list();
    log::info!("Found {} device(s)", destinations.len());

    if let Some(dir) = default_dir.filter(|d| d.is_dir()) {
        let free = DiskSpace.available_space(dir).unwrap_or(0);
        destinations.push(Destination::default_directory(dir, free));
    }
    destinations
}
