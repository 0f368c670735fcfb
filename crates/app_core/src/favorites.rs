//! Persisted favorites and preferences
//!
//! The state file is the only durable artifact. It is always read and
//! written whole; a missing or unreadable file is treated as fresh state.

use crate::{AppError, Result};
use app_fs::{CanonicalPath, DirectoryEntry, FsError};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Glyph for user-added folders
pub const DEFAULT_GLYPH: &str = "📁";

fn default_glyph() -> String {
    DEFAULT_GLYPH.to_string()
}

/// One favorite folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub path: PathBuf,
    pub label: String,
    #[serde(rename = "emoji", default = "default_glyph")]
    pub glyph: String,
}

impl FavoriteRecord {
    fn canonical(&self) -> CanonicalPath {
        CanonicalPath::new(&self.path)
    }
}

/// Display preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    /// List hidden entries
    pub show_hidden: bool,
    /// Keep file extensions in displayed labels
    pub show_extensions: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_hidden: false,
            show_extensions: true,
        }
    }
}

impl Preferences {
    /// Whether `entry` should be shown under these preferences
    pub fn admits(&self, entry: &DirectoryEntry) -> bool {
        self.show_hidden || !entry.is_hidden
    }

    pub fn label_for(&self, entry: &DirectoryEntry) -> String {
        entry.display_name(self.show_extensions)
    }

    fn apply(&mut self, patch: &PreferencesPatch) {
        if let Some(show_hidden) = patch.show_hidden {
            self.show_hidden = show_hidden;
        }
        if let Some(show_extensions) = patch.show_extensions {
            self.show_extensions = show_extensions;
        }
    }
}

/// Partial preference update; absent fields are left unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub show_hidden: Option<bool>,
    pub show_extensions: Option<bool>,
}

/// Everything that survives a restart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    pub setup_completed: bool,
    pub items: Vec<FavoriteRecord>,
    #[serde(rename = "prefs")]
    pub preferences: Preferences,
}

impl PersistedState {
    pub fn contains(&self, path: &Path) -> bool {
        let target = CanonicalPath::new(path);
        self.items.iter().any(|it| it.canonical() == target)
    }

    /// Append `record` unless its path is already present
    pub fn insert(&mut self, record: FavoriteRecord) -> bool {
        if self.contains(&record.path) {
            return false;
        }
        self.items.push(record);
        true
    }

    /// Collapse records sharing a canonical path, keeping the first
    fn dedupe(&mut self) -> bool {
        let before = self.items.len();
        let mut seen = Vec::with_capacity(before);
        self.items.retain(|it| {
            let key = it.canonical();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        self.items.len() != before
    }
}

/// Sole reader and writer of the persisted state file
pub struct FavoritesStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
    observers: Mutex<Vec<Sender<Preferences>>>,
}

impl FavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; never fails
    pub fn load(&self) -> PersistedState {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Cannot read {}: {}; using fresh state", self.path.display(), e);
                }
                return PersistedState::default();
            }
        };

        match serde_json::from_str::<PersistedState>(&content) {
            Ok(mut state) => {
                if state.dedupe() {
                    tracing::warn!("Dropped duplicate favorites from {}", self.path.display());
                }
                state
            }
            Err(e) => {
                tracing::warn!("Corrupt state file {}: {}; using fresh state", self.path.display(), e);
                PersistedState::default()
            }
        }
    }

    /// Write the whole state: temp file in the same directory, then rename over
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(state)?;
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        std::fs::write(&staging, content)?;
        std::fs::rename(&staging, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            AppError::State(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::debug!("Saved favorites state to {}", self.path.display());
        Ok(())
    }

    /// Load, apply `f`, save if `f` reports a change, return the new state
    pub fn update<F>(&self, f: F) -> Result<PersistedState>
    where
        F: FnOnce(&mut PersistedState) -> bool,
    {
        let _guard = self.write_lock.lock();
        let mut state = self.load();
        if f(&mut state) {
            self.save(&state)?;
        }
        Ok(state)
    }

    pub fn items(&self) -> Vec<FavoriteRecord> {
        self.load().items
    }

    /// Favorite the directory at `path`
    pub fn add(&self, path: &Path, label: Option<&str>, glyph: Option<&str>) -> Result<Vec<FavoriteRecord>> {
        let metadata =
            std::fs::metadata(path).map_err(|_| FsError::NotFound(path.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(path.to_path_buf()).into());
        }

        let canonical = CanonicalPath::new(path);
        let label = label.map(str::to_string).unwrap_or_else(|| {
            canonical
                .as_path()
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| canonical.to_string())
        });
        let record = FavoriteRecord {
            path: canonical.into_path_buf(),
            label,
            glyph: glyph.map(str::to_string).unwrap_or_else(default_glyph),
        };

        let state = self.update(|state| state.insert(record))?;
        tracing::info!("Favorited {}", path.display());
        Ok(state.items)
    }

    /// Drop the record for `path`; absent records are fine
    pub fn remove(&self, path: &Path) -> Result<Vec<FavoriteRecord>> {
        let target = CanonicalPath::new(path);
        let state = self.update(|state| {
            let before = state.items.len();
            state.items.retain(|it| it.canonical() != target);
            state.items.len() != before
        })?;
        Ok(state.items)
    }

    /// Point records at `old` (and below it) to `new`.
    ///
    /// The record equal to `old` also gets `label` when one is given.
    pub fn reconcile_relocation(&self, old: &Path, new: &Path, label: Option<&str>) -> Result<Vec<FavoriteRecord>> {
        let old = CanonicalPath::new(old);
        let new = CanonicalPath::new(new);

        let state = self.update(|state| {
            let mut changed = false;
            for item in state.items.iter_mut() {
                let current = item.canonical();
                let Some(rebased) = current.rebase(&old, &new) else {
                    continue;
                };
                if current == old {
                    if let Some(label) = label {
                        item.label = label.to_string();
                    }
                }
                item.path = rebased.into_path_buf();
                changed = true;
            }
            if changed {
                state.dedupe();
            }
            changed
        })?;

        Ok(state.items)
    }

    /// Drop the record for a deleted `path`.
    ///
    /// Records of folders below `path` are left in place and reported.
    pub fn reconcile_removal(&self, path: &Path) -> Result<Vec<FavoriteRecord>> {
        let target = CanonicalPath::new(path);
        let state = self.update(|state| {
            let before = state.items.len();
            state.items.retain(|it| it.canonical() != target);
            state.items.len() != before
        })?;

        for stale in state.items.iter().filter(|it| it.canonical().is_within(&target)) {
            tracing::warn!(
                "Favorite {} points inside removed folder {}",
                stale.path.display(),
                path.display()
            );
        }
        Ok(state.items)
    }

    pub fn preferences(&self) -> Preferences {
        self.load().preferences
    }

    /// Merge `patch` into the stored preferences and notify observers
    pub fn set_preferences(&self, patch: &PreferencesPatch) -> Result<Preferences> {
        let state = self.update(|state| {
            state.preferences.apply(patch);
            true
        })?;

        let prefs = state.preferences;
        self.observers.lock().retain(|tx| tx.send(prefs).is_ok());
        tracing::info!("Preferences updated: {:?}", prefs);
        Ok(prefs)
    }

    /// Receive every preference set written from now on
    pub fn subscribe(&self) -> Receiver<Preferences> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.observers.lock().push(tx);
        rx
    }
}
