use log::LevelFilter;
use pdf_cover::PageGeometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application settings, read from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file holding API keys; relative paths are taken from the config file's directory
    pub api_keys_file: PathBuf,
    pub default_export_directory: Option<PathBuf>,
    pub cover_search_results: usize,
    pub cover_page_size: String,
    pub cover_dpi: u16,
    pub thumbnail_size: [u32; 2],
    pub max_concurrent_downloads: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub ai_model: String,
    pub ai_size: String,
    pub ai_quality: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_keys_file: PathBuf::from("api_keys.json"),
            default_export_directory: None,
            cover_search_results: 8,
            cover_page_size: "A4".to_string(),
            cover_dpi: 300,
            thumbnail_size: [150, 200],
            max_concurrent_downloads: 4,
            log_level: "info".to_string(),
            log_file: None,
            ai_model: "dall-e-3".to_string(),
            ai_size: "1024x1792".to_string(),
            ai_quality: "standard".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file. A missing or unreadable file gives the defaults.
    ///
    /// Each setting in the file is taken on its own: one with the wrong type
    /// keeps its default and the others still apply.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Could not load {}: {}; using defaults", path.display(), e);
                return Self::default();
            }
        };

        let settings = match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(settings)) => settings,
            Ok(_) => {
                log::warn!("{} is not a JSON object; using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                return Self::default();
            }
        };

        let mut config = Self::overlay_defaults(settings);
        config.validate();
        config
    }

    fn overlay_defaults(settings: Map<String, Value>) -> Self {
        let Ok(Value::Object(mut merged)) = serde_json::to_value(Self::default()) else {
            return Self::default();
        };

        for (key, value) in settings {
            if !merged.contains_key(&key) {
                log::debug!("Ignoring unknown setting '{}'", key);
                continue;
            }
            let single = Map::from_iter([(key.clone(), value.clone())]);
            match serde_json::from_value::<AppConfig>(Value::Object(single)) {
                Ok(_) => {
                    merged.insert(key, value);
                }
                Err(e) => log::warn!("Invalid setting '{}': {}; using default", key, e),
            }
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or_else(|e| {
            log::warn!("Could not apply settings: {}; using defaults", e);
            Self::default()
        })
    }

    /// Save to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await
    }

    /// Reset out-of-range settings to their defaults.
    pub fn validate(&mut self) {
        let defaults = Self::default();

        if let Err(e) = PageGeometry::from_name(&self.cover_page_size) {
            log::warn!("{}; using {}", e, defaults.cover_page_size);
            self.cover_page_size = defaults.cover_page_size;
        }
        if self.cover_dpi == 0 {
            log::warn!("cover_dpi must be positive; using {}", defaults.cover_dpi);
            self.cover_dpi = defaults.cover_dpi;
        }
        if self.thumbnail_size.contains(&0) {
            log::warn!(
                "thumbnail_size {:?} has an empty side; using {:?}",
                self.thumbnail_size,
                defaults.thumbnail_size
            );
            self.thumbnail_size = defaults.thumbnail_size;
        }
        if self.max_concurrent_downloads == 0 {
            log::warn!(
                "max_concurrent_downloads must be positive; using {}",
                defaults.max_concurrent_downloads
            );
            self.max_concurrent_downloads = defaults.max_concurrent_downloads;
        }
        if LevelFilter::from_str(&self.log_level).is_err() {
            log::warn!("Unknown log_level '{}'; using {}", self.log_level, defaults.log_level);
            self.log_level = defaults.log_level;
        }
    }

    pub fn thumbnail_size(&self) -> (u32, u32) {
        (self.thumbnail_size[0], self.thumbnail_size[1])
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    /// Where the API keys file lives for a config read from `config_path`.
    pub fn api_keys_path(&self, config_path: &Path) -> PathBuf {
        if self.api_keys_file.is_absolute() {
            return self.api_keys_file.clone();
        }
        config_path
            .parent()
            .map(|dir| dir.join(&self.api_keys_file))
            .unwrap_or_else(|| self.api_keys_file.clone())
    }
}

/// Credentials for the remote services. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Secrets {
    pub google_books_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Secrets {
    /// Load the API keys file. Problems are logged and yield no keys.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Could not load API keys from {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice::<Secrets>(&bytes) {
            Ok(secrets) => secrets.without_blanks(),
            Err(e) => {
                log::warn!("Could not load API keys from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn without_blanks(self) -> Self {
        let keep = |key: Option<String>| key.filter(|k| !k.trim().is_empty());
        Self {
            google_books_api_key: keep(self.google_books_api_key),
            openai_api_key: keep(self.openai_api_key),
        }
    }
}
