//! Directory listing with metadata and pluggable icon resolution

use crate::{FsError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Names starting with this marker are hidden
const HIDDEN_PREFIX: char = '.';

/// Requested icon size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconSize {
    Small,
    #[default]
    Normal,
    Large,
}

/// Opaque icon reference produced by an [`IconProvider`]; empty when unavailable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconHandle(pub String);

impl IconHandle {
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Icon resolution capability supplied by the UI shell
pub trait IconProvider: Send + Sync {
    fn resolve_icon(&self, path: &Path, size: IconSize) -> std::result::Result<IconHandle, String>;
}

/// Provider that never has an icon
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIcons;

impl IconProvider for NoIcons {
    fn resolve_icon(&self, _path: &Path, _size: IconSize) -> std::result::Result<IconHandle, String> {
        Ok(IconHandle::empty())
    }
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    /// Always 0 for directories
    pub size_bytes: u64,
    #[serde(rename = "mtimeMs")]
    pub modified_time_millis: i64,
    #[serde(rename = "type")]
    pub type_label: String,
    pub is_hidden: bool,
    pub icon: IconHandle,
}

impl DirectoryEntry {
    /// Build an entry from the link status of `path` (symlinks are not followed)
    fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let is_dir = metadata.is_dir();

        let modified_time_millis = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(Self {
            type_label: type_label(&name, is_dir),
            is_hidden: name.starts_with(HIDDEN_PREFIX),
            size_bytes: if is_dir { 0 } else { metadata.len() },
            path: path.to_path_buf(),
            name,
            is_dir,
            modified_time_millis,
            icon: IconHandle::empty(),
        })
    }

    /// Label shown in the UI; extensions of files are dropped unless `show_extensions`
    pub fn display_name(&self, show_extensions: bool) -> String {
        crate::display_name(&self.name, self.is_dir, show_extensions)
    }
}

fn type_label(name: &str, is_dir: bool) -> String {
    if is_dir {
        return "Folder".to_string();
    }
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "File".to_string())
}

/// Lists the immediate children of a directory
#[derive(Clone)]
pub struct DirectoryReader {
    icons: Arc<dyn IconProvider>,
}

impl DirectoryReader {
    pub fn new(icons: Arc<dyn IconProvider>) -> Self {
        Self { icons }
    }

    /// List `dir`, directories first, then case-insensitive by name.
    ///
    /// Children that cannot be stat'ed are skipped; icon failures leave the
    /// entry's icon empty.
    pub fn list<P: AsRef<Path>>(&self, dir: P, size: IconSize) -> Result<Vec<DirectoryEntry>> {
        let dir = dir.as_ref();

        let metadata = fs::metadata(dir).map_err(|_| FsError::NotFound(dir.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(dir.to_path_buf()));
        }

        let mut entries = Vec::new();
        for child in fs::read_dir(dir)? {
            let child = match child {
                Ok(c) => c,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            let mut entry = match DirectoryEntry::from_path(&child.path()) {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", child.path().display(), e);
                    continue;
                }
            };

            entry.icon = match self.icons.resolve_icon(&entry.path, size) {
                Ok(icon) => icon,
                Err(e) => {
                    tracing::debug!("Icon lookup failed for {}: {}", entry.path.display(), e);
                    IconHandle::empty()
                }
            };

            entries.push(entry);
        }

        sort_entries(&mut entries);
        Ok(entries)
    }
}

impl Default for DirectoryReader {
    fn default() -> Self {
        Self::new(Arc::new(NoIcons))
    }
}

/// Directories before files, then case-insensitive name; exact name breaks ties
fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        if a.is_dir != b.is_dir {
            return if a.is_dir { Ordering::Less } else { Ordering::Greater };
        }
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingIcons;

    impl IconProvider for FailingIcons {
        fn resolve_icon(&self, _path: &Path, _size: IconSize) -> std::result::Result<IconHandle, String> {
            Err("no icon theme".into())
        }
    }

    struct SizeIcons;

    impl IconProvider for SizeIcons {
        fn resolve_icon(&self, _path: &Path, size: IconSize) -> std::result::Result<IconHandle, String> {
            Ok(IconHandle(format!("icon:{:?}", size)))
        }
    }

    fn names(entries: &[DirectoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_directories_first_then_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("beta.txt"), "b").unwrap();
        fs::write(base.join("Alpha.md"), "a").unwrap();
        fs::create_dir(base.join("zeta")).unwrap();
        fs::create_dir(base.join("Docs")).unwrap();
        fs::write(base.join(".env"), "x").unwrap();

        let entries = DirectoryReader::default().list(base, IconSize::Normal).unwrap();
        assert_eq!(names(&entries), vec!["Docs", "zeta", ".env", "Alpha.md", "beta.txt"]);

        let again = DirectoryReader::default().list(base, IconSize::Normal).unwrap();
        assert_eq!(entries, again);
    }

    #[test]
    fn test_entry_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("notes.txt"), "hello").unwrap();
        fs::write(base.join("Makefile"), "all:").unwrap();
        fs::write(base.join(".hidden"), "").unwrap();
        fs::create_dir(base.join("src")).unwrap();

        let entries = DirectoryReader::default().list(base, IconSize::Small).unwrap();
        let find = |n: &str| entries.iter().find(|e| e.name == n).unwrap();

        let dir = find("src");
        assert!(dir.is_dir);
        assert_eq!(dir.size_bytes, 0);
        assert_eq!(dir.type_label, "Folder");

        let notes = find("notes.txt");
        assert_eq!(notes.size_bytes, 5);
        assert_eq!(notes.type_label, "txt");
        assert!(notes.modified_time_millis > 0);
        assert_eq!(notes.path, base.join("notes.txt"));

        assert_eq!(find("Makefile").type_label, "File");
        assert!(find(".hidden").is_hidden);
        assert!(!notes.is_hidden);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_listed() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        std::os::unix::fs::symlink(base.join("missing"), base.join("broken")).unwrap();
        std::os::unix::fs::symlink(base, base.join("loop")).unwrap();

        let entries = DirectoryReader::default().list(base, IconSize::Normal).unwrap();
        assert_eq!(names(&entries), vec!["broken", "loop"]);
        // A link to a directory is classified by the link itself
        assert!(entries.iter().all(|e| !e.is_dir));
    }

    #[test]
    fn test_icon_failure_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.png"), "").unwrap();

        let reader = DirectoryReader::new(Arc::new(FailingIcons));
        let entries = reader.list(tmp.path(), IconSize::Large).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].icon.is_empty());

        let reader = DirectoryReader::new(Arc::new(SizeIcons));
        let entries = reader.list(tmp.path(), IconSize::Large).unwrap();
        assert_eq!(entries[0].icon, IconHandle("icon:Large".into()));
    }

    #[test]
    fn test_missing_and_file_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let reader = DirectoryReader::default();

        let missing = reader.list(tmp.path().join("nope"), IconSize::Normal);
        assert!(matches!(missing, Err(FsError::NotFound(_))));

        let file = tmp.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(reader.list(&file, IconSize::Normal), Err(FsError::NotADirectory(_))));
    }

    #[test]
    fn test_entry_serialization() {
        let entry = DirectoryEntry {
            name: "a.txt".into(),
            path: PathBuf::from("/tmp/a.txt"),
            is_dir: false,
            size_bytes: 3,
            modified_time_millis: 1000,
            type_label: "txt".into(),
            is_hidden: false,
            icon: IconHandle::empty(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"isDir\":false"));
        assert!(json.contains("\"mtimeMs\":1000"));
        assert!(json.contains("\"type\":\"txt\""));
    }
}
