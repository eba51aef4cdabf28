use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Crates whose debug output is worth showing
const OWN_TARGETS: [&str; 5] = ["coverj", "cover_search", "cover_delivery", "cover_runtime", "pdf_cover"];

/// Writes log lines to stderr and, once configured, to a log file
#[derive(Clone, Default)]
pub struct CliLogger {
    file: Arc<Mutex<Option<File>>>,
}

impl CliLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global logger at `info` until configured.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(LevelFilter::Info);
        Ok(())
    }

    /// Apply the configured level and start appending to `log_file`.
    pub fn configure(&self, level: LevelFilter, log_file: Option<&Path>) -> std::io::Result<()> {
        log::set_max_level(level);
        if let Some(path) = log_file {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            if let Ok(mut slot) = self.file.lock() {
                *slot = Some(file);
            }
        }
        Ok(())
    }
}

fn format_line(timestamp: DateTime<Local>, level: Level, target: &str, message: &str) -> String {
    format!(
        "{}  {:<5}  {}  {}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        level,
        target,
        message
    )
}

impl log::Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let own = OWN_TARGETS.iter().any(|t| metadata.target().starts_with(t));
        metadata.level() <= log::max_level() && (own || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(
            Local::now(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        eprintln!("{line}");

        if let Ok(mut slot) = self.file.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut slot) = self.file.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_format() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let line = format_line(timestamp, Level::Warn, "cover_search", "Google Books search failed");
        assert_eq!(line, "2024-03-09 14:05:07  WARN   cover_search  Google Books search failed");
    }

    #[test]
    fn test_configure_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverj.log");
        let logger = CliLogger::new();
        logger.configure(LevelFilter::Info, Some(&path)).unwrap();
        assert!(path.exists());
    }
}
