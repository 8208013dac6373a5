use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_SNAPSHOT_BASE: &str = "https://gist.githubusercontent.com/dahemi02/73e59374abde5e63c1d2c2b645792e00/raw/dc61bf98f9ec4ce31f4351ed11bc5c94702d3ccc";

/// Root application configuration, loaded from `~/.config/chapters/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub books_url: String,
    pub authors_url: String,
    /// Per-request timeout for snapshot fetches.
    pub timeout_secs: u64,
    pub probe_host: String,
    pub probe_port: u16,
    pub probe_timeout_ms: u64,
    /// Directory holding `books.json` / `authors.json`. Unset means the
    /// snapshots compiled into the binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub covers_base_url: String,
    pub default_limit: u32,
    pub cover_size: String,
    pub timeout_secs: u64,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("chapters");

        Self {
            database_path: data_dir.join("chapters.db").to_string_lossy().to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            books_url: format!("{DEFAULT_SNAPSHOT_BASE}/books.json"),
            authors_url: format!("{DEFAULT_SNAPSHOT_BASE}/authors.json"),
            timeout_secs: 10,
            probe_host: "gist.githubusercontent.com".to_string(),
            probe_port: 443,
            probe_timeout_ms: 3000,
            assets_dir: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openlibrary.org".to_string(),
            covers_base_url: "https://covers.openlibrary.org".to_string(),
            default_limit: 20,
            cover_size: "M".to_string(),
            timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/chapters/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CHAPTERS_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("chapters")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.database_path)
    }

    pub fn set_database_path(&mut self, path: PathBuf) {
        self.storage.database_path = path.to_string_lossy().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.sync.timeout_secs, 10);
        assert!(cfg.sync.books_url.ends_with("books.json"));
        assert!(cfg.sync.authors_url.ends_with("authors.json"));
        assert!(cfg.database_path().to_string_lossy().contains("chapters.db"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.sync.assets_dir = Some("/opt/chapters/assets".to_string());
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.sync.books_url, cfg.sync.books_url);
        assert_eq!(loaded.sync.assets_dir, cfg.sync.assets_dir);
        assert_eq!(loaded.search.default_limit, 20);
    }

    #[test]
    fn test_database_path_override_is_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.set_database_path(dir.path().join("override.db"));
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.database_path(), dir.path().join("override.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\ntimeout_secs = 3\n").unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.sync.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.sync.probe_port, 443);
        assert_eq!(cfg.search.cover_size, "M");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_chapters_config.toml")).unwrap();
        assert_eq!(cfg.sync.probe_timeout(), Duration::from_millis(3000));
    }
}
