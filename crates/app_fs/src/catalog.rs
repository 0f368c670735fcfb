//! Well-known system folders and the protection check built on them

use crate::CanonicalPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The six fixed system folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemFolder {
    Desktop,
    Downloads,
    Documents,
    Music,
    Pictures,
    Videos,
}

impl SystemFolder {
    pub const ALL: [SystemFolder; 6] = [
        SystemFolder::Desktop,
        SystemFolder::Downloads,
        SystemFolder::Documents,
        SystemFolder::Music,
        SystemFolder::Pictures,
        SystemFolder::Videos,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SystemFolder::Desktop => "desktop",
            SystemFolder::Downloads => "downloads",
            SystemFolder::Documents => "documents",
            SystemFolder::Music => "music",
            SystemFolder::Pictures => "pictures",
            SystemFolder::Videos => "videos",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SystemFolder::Desktop => "Desktop",
            SystemFolder::Downloads => "Downloads",
            SystemFolder::Documents => "Documents",
            SystemFolder::Music => "Music",
            SystemFolder::Pictures => "Pictures",
            SystemFolder::Videos => "Videos",
        }
    }

    /// Glyph reserved for this folder in the favorites panel
    pub fn glyph(&self) -> &'static str {
        match self {
            SystemFolder::Desktop => "🖥️",
            SystemFolder::Downloads => "⬇️",
            SystemFolder::Documents => "📄",
            SystemFolder::Music => "🎵",
            SystemFolder::Pictures => "🖼️",
            SystemFolder::Videos => "🎬",
        }
    }

    fn platform_path(&self) -> Option<PathBuf> {
        match self {
            SystemFolder::Desktop => dirs_next::desktop_dir(),
            SystemFolder::Downloads => dirs_next::download_dir(),
            SystemFolder::Documents => dirs_next::document_dir(),
            SystemFolder::Music => dirs_next::audio_dir(),
            SystemFolder::Pictures => dirs_next::picture_dir(),
            SystemFolder::Videos => dirs_next::video_dir(),
        }
    }
}

/// Snapshot of one system folder; `exists` is checked at call time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemFolderDescriptor {
    pub key: SystemFolder,
    pub label: String,
    #[serde(rename = "emoji")]
    pub glyph: String,
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Clone)]
enum FolderSource {
    Platform,
    Fixed(HashMap<SystemFolder, PathBuf>),
}

/// Resolves system folder locations.
///
/// Existence is never cached: a folder deleted or recreated between two
/// calls is seen as such by the second call.
#[derive(Debug, Clone)]
pub struct PathCatalog {
    source: FolderSource,
}

impl PathCatalog {
    /// Catalog backed by the platform's user directories
    pub fn new() -> Self {
        Self {
            source: FolderSource::Platform,
        }
    }

    /// Catalog with explicit locations; folders missing from `paths` are unknown
    pub fn with_paths(paths: HashMap<SystemFolder, PathBuf>) -> Self {
        Self {
            source: FolderSource::Fixed(paths),
        }
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        dirs_next::home_dir()
    }

    fn resolve(&self, folder: SystemFolder) -> Option<PathBuf> {
        match &self.source {
            FolderSource::Platform => folder
                .platform_path()
                .or_else(|| self.home_dir().map(|home| home.join(folder.label()))),
            FolderSource::Fixed(paths) => paths.get(&folder).cloned(),
        }
    }

    /// All six folders in fixed order.
    ///
    /// A folder the platform does not report is looked for under the home
    /// directory by its label.
    pub fn system_folders(&self) -> Vec<SystemFolderDescriptor> {
        SystemFolder::ALL
            .into_iter()
            .filter_map(|folder| {
                let path = self.resolve(folder)?;
                let exists = path.is_dir();
                Some(SystemFolderDescriptor {
                    key: folder,
                    label: folder.label().to_string(),
                    glyph: folder.glyph().to_string(),
                    path,
                    exists,
                })
            })
            .collect()
    }

    pub fn descriptor(&self, folder: SystemFolder) -> Option<SystemFolderDescriptor> {
        self.system_folders().into_iter().find(|d| d.key == folder)
    }

    /// True iff `path` is one of the system folders that currently exist
    pub fn is_protected_path<P: AsRef<Path>>(&self, path: P) -> bool {
        let target = CanonicalPath::new(path);
        self.system_folders()
            .iter()
            .filter(|d| d.exists)
            .any(|d| CanonicalPath::new(&d.path) == target)
    }
}

impl Default for PathCatalog {
    fn default() -> Self {
        Self::new()
    }
}
