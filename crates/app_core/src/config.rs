//! Engine configuration

use app_fs::{ArchiveBridge, SevenZipTool, ZipTool};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const STATE_FILE_NAME: &str = "favorites-state.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "Foldermark", "Foldermark")
}

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub archive: ArchiveConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the per-user favorites file location
    pub state_file: Option<PathBuf>,
}

/// External archiver locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Info-ZIP `zip`; unset means the platform tool
    pub zip_program: Option<PathBuf>,
    /// Info-ZIP `unzip`; unset means the platform tool
    pub unzip_program: Option<PathBuf>,
    /// Probed in order when a 7z archive is extracted
    pub seven_zip_candidates: Vec<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            zip_program: None,
            unzip_program: None,
            seven_zip_candidates: SevenZipTool::default_candidates(),
        }
    }
}

impl ArchiveConfig {
    pub fn bridge(&self) -> ArchiveBridge {
        let zip = match (&self.zip_program, &self.unzip_program) {
            (None, None) => ZipTool::platform(),
            (zip, unzip) => ZipTool::info_zip(
                zip.clone().unwrap_or_else(|| PathBuf::from("zip")),
                unzip.clone().unwrap_or_else(|| PathBuf::from("unzip")),
            ),
        };
        ArchiveBridge::new(Arc::new(zip), self.seven_zip_candidates.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

impl EngineConfig {
    /// Load configuration from the per-user file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`; a missing file means defaults
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Where the favorites state lives
    pub fn state_file(&self) -> PathBuf {
        self.storage.state_file.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().join(STATE_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(".").join(STATE_FILE_NAME))
        })
    }
}
