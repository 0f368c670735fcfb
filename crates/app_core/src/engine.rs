//! Engine facade: filesystem operations plus favorites reconciliation
//!
//! Each call runs to completion on the calling thread. The favorites file is
//! only written after the filesystem operation it depends on has succeeded.

use crate::{
    EngineConfig, FavoriteRecord, FavoritesStore, PersistedState, Preferences,
    PreferencesPatch, Result, SetupCoordinator,
};
use app_fs::{
    ArchiveBridge, DefaultFileOperations, DirectoryEntry, DirectoryReader, FileOperations, FsError,
    IconProvider, IconSize, PathCatalog, SystemFolderDescriptor,
};
use crossbeam_channel::Receiver;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of an operation that relocates a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relocation {
    pub new_path: PathBuf,
    pub favorites: Vec<FavoriteRecord>,
}

pub struct Engine {
    catalog: PathCatalog,
    reader: DirectoryReader,
    ops: Box<dyn FileOperations>,
    archive: ArchiveBridge,
    store: FavoritesStore,
}

impl Engine {
    pub fn new(
        catalog: PathCatalog,
        reader: DirectoryReader,
        ops: Box<dyn FileOperations>,
        archive: ArchiveBridge,
        store: FavoritesStore,
    ) -> Self {
        Self {
            catalog,
            reader,
            ops,
            archive,
            store,
        }
    }

    /// Production wiring: platform folders, system trash, configured tools
    pub fn from_config(config: &EngineConfig, icons: Arc<dyn IconProvider>) -> Self {
        let catalog = PathCatalog::new();
        let state_file = config.state_file();
        tracing::info!("Favorites state file: {}", state_file.display());

        Self::new(
            catalog.clone(),
            DirectoryReader::new(icons),
            Box::new(DefaultFileOperations::new(catalog)),
            config.archive.bridge(),
            FavoritesStore::new(state_file),
        )
    }

    pub fn home_dir(&self) -> Result<PathBuf> {
        self.catalog
            .home_dir()
            .ok_or_else(|| FsError::NotFound(PathBuf::from("~")).into())
    }

    pub fn open_path(&self, path: &Path) -> Result<()> {
        Ok(self.ops.open_external(path)?)
    }

    /// Sorted listing of `dir`; unreadable directories list as empty
    pub fn list_directory(&self, dir: &Path, size: IconSize) -> Vec<DirectoryEntry> {
        match self.reader.list(dir, size) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot list {}: {}", dir.display(), e);
                Vec::new()
            }
        }
    }

    /// Move `source` into `dest_dir`; favorites follow the moved folder
    pub fn move_path(&self, source: &Path, dest_dir: &Path) -> Result<Relocation> {
        let new_path = self.ops.move_to(source, dest_dir)?;
        let favorites = self.store.reconcile_relocation(source, &new_path, None)?;
        Ok(Relocation {
            new_path,
            favorites,
        })
    }

    pub fn copy_path(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        Ok(self.ops.copy_to(source, dest_dir)?)
    }

    /// Rename in place; the matching favorite takes the new path and label
    pub fn rename_path(&self, old_path: &Path, new_name: &str) -> Result<Relocation> {
        let new_path = self.ops.rename(old_path, new_name)?;
        let favorites = self
            .store
            .reconcile_relocation(old_path, &new_path, Some(new_name))?;
        Ok(Relocation {
            new_path,
            favorites,
        })
    }

    /// Send `path` to the trash and drop its favorite record
    pub fn trash_path(&self, path: &Path) -> Result<Vec<FavoriteRecord>> {
        self.ops.trash(path)?;
        self.store.reconcile_removal(path)
    }

    pub fn add_favorite(&self, path: &Path) -> Result<Vec<FavoriteRecord>> {
        self.store.add(path, None, None)
    }

    pub fn remove_favorite(&self, path: &Path) -> Result<Vec<FavoriteRecord>> {
        self.store.remove(path)
    }

    /// Favorites-panel rename: renames the folder itself
    pub fn rename_favorite(&self, path: &Path, new_name: &str) -> Result<Relocation> {
        self.rename_path(path, new_name)
    }

    pub fn favorites_state(&self) -> PersistedState {
        self.store.load()
    }

    pub fn system_folders(&self) -> Vec<SystemFolderDescriptor> {
        self.catalog.system_folders()
    }

    pub fn complete_setup<S: AsRef<str>>(&self, keys: &[S]) -> Result<PersistedState> {
        SetupCoordinator::new(&self.store, &self.catalog).complete_with_selections(keys)
    }

    pub fn skip_setup(&self) -> Result<PersistedState> {
        SetupCoordinator::new(&self.store, &self.catalog).skip()
    }

    pub fn compress(&self, paths: &[PathBuf], dest_dir: &Path) -> Result<PathBuf> {
        Ok(self.archive.compress(paths, dest_dir)?)
    }

    pub fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        Ok(self.archive.extract(archive, dest_dir)?)
    }

    pub fn preferences(&self) -> Preferences {
        self.store.preferences()
    }

    pub fn set_preferences(&self, patch: &PreferencesPatch) -> Result<Preferences> {
        self.store.set_preferences(patch)
    }

    pub fn subscribe_preferences(&self) -> Receiver<Preferences> {
        self.store.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::AppError;
    use app_fs::{ArchiveTool, Recycler, SystemFolder};
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::fs;

    /// Moves recycled paths into a bin directory
    pub(crate) struct BinRecycler(pub PathBuf);

    impl Recycler for BinRecycler {
        fn recycle(&self, path: &Path) -> app_fs::Result<()> {
            fs::create_dir_all(&self.0)?;
            fs::rename(path, self.0.join(path.file_name().unwrap()))?;
            Ok(())
        }
    }

    /// Writes a placeholder archive instead of running a tool
    pub(crate) struct StubZip;

    impl ArchiveTool for StubZip {
        fn name(&self) -> &str {
            "stub-zip"
        }

        fn compress(&self, _dir: &Path, _names: &[OsString], output: &Path) -> app_fs::Result<()> {
            fs::write(output, b"PK")?;
            Ok(())
        }

        fn extract(&self, _archive: &Path, _dest: &Path) -> app_fs::Result<()> {
            Ok(())
        }
    }

    pub(crate) struct TestEngine {
        _tmp: tempfile::TempDir,
        pub home: PathBuf,
        pub engine: Engine,
    }

    /// Engine rooted in a temp dir: `home/Desktop` exists, other system folders don't
    pub(crate) fn test_engine() -> TestEngine {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join("Users").join("x");
        fs::create_dir_all(home.join("Desktop")).unwrap();

        let catalog = PathCatalog::with_paths(
            SystemFolder::ALL
                .into_iter()
                .map(|f| (f, home.join(f.label())))
                .collect::<HashMap<_, _>>(),
        );
        let ops = DefaultFileOperations::with_recycler(
            catalog.clone(),
            Box::new(BinRecycler(tmp.path().join("Trash"))),
        );
        let engine = Engine::new(
            catalog,
            DirectoryReader::default(),
            Box::new(ops),
            ArchiveBridge::new(Arc::new(StubZip), vec![tmp.path().join("no-7z")]),
            FavoritesStore::new(tmp.path().join("state").join("favorites-state.json")),
        );

        TestEngine { _tmp: tmp, home, engine }
    }

    #[test]
    fn test_add_rename_trash_scenario() {
        let t = test_engine();
        let projects = t.home.join("Projects");
        fs::create_dir(&projects).unwrap();

        let items = t.engine.add_favorite(&projects).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "Projects");

        let renamed = t.engine.rename_favorite(&projects, "Work").unwrap();
        let work = t.home.join("Work");
        assert_eq!(renamed.new_path, work);
        assert_eq!(renamed.favorites[0].path, work);
        assert_eq!(renamed.favorites[0].label, "Work");

        let items = t.engine.trash_path(&work).unwrap();
        assert!(items.is_empty());
        assert!(!work.exists());
        assert!(t.engine.favorites_state().items.is_empty());
    }

    #[test]
    fn test_protected_folder_untouched() {
        let t = test_engine();
        let desktop = t.home.join("Desktop");
        t.engine.add_favorite(&desktop).unwrap();

        assert!(matches!(
            t.engine.rename_path(&desktop, "Desk"),
            Err(AppError::Fs(FsError::ProtectedPath(_)))
        ));
        assert!(matches!(
            t.engine.trash_path(&desktop),
            Err(AppError::Fs(FsError::ProtectedPath(_)))
        ));
        assert!(matches!(
            t.engine.move_path(&desktop, &t.home),
            Err(AppError::Fs(FsError::ProtectedPath(_)))
        ));

        assert!(desktop.is_dir());
        assert_eq!(t.engine.favorites_state().items.len(), 1);
    }

    #[test]
    fn test_failed_rename_leaves_state_alone() {
        let t = test_engine();
        let a = t.home.join("A");
        fs::create_dir(&a).unwrap();
        fs::create_dir(t.home.join("B")).unwrap();
        t.engine.add_favorite(&a).unwrap();
        let before = fs::read(t.engine.store.path()).unwrap();

        assert!(t.engine.rename_path(&a, "B").is_err());
        assert!(t.engine.rename_path(&a, "x/y").is_err());

        assert_eq!(fs::read(t.engine.store.path()).unwrap(), before);
        assert!(a.is_dir());
    }

    #[test]
    fn test_move_reconciles_favorites() {
        let t = test_engine();
        let src = t.home.join("Projects");
        fs::create_dir_all(src.join("app")).unwrap();
        let archive = t.home.join("Archive");
        fs::create_dir(&archive).unwrap();
        t.engine.add_favorite(&src).unwrap();
        t.engine.add_favorite(&src.join("app")).unwrap();

        let moved = t.engine.move_path(&src, &archive).unwrap();
        assert_eq!(moved.new_path, archive.join("Projects"));
        assert_eq!(moved.favorites[0].path, archive.join("Projects"));
        assert_eq!(moved.favorites[0].label, "Projects");
        assert_eq!(moved.favorites[1].path, archive.join("Projects").join("app"));

        let back = t.engine.move_path(&moved.new_path, &t.home).unwrap();
        assert_eq!(back.new_path, src);
        assert_eq!(back.favorites[0].path, src);
    }

    #[test]
    fn test_trash_keeps_descendant_records() {
        let t = test_engine();
        let parent = t.home.join("Parent");
        let child = parent.join("Child");
        fs::create_dir_all(&child).unwrap();
        t.engine.add_favorite(&parent).unwrap();
        t.engine.add_favorite(&child).unwrap();

        let items = t.engine.trash_path(&parent).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, child);
    }

    #[test]
    fn test_listing_degrades_to_empty() {
        let t = test_engine();
        assert!(t
            .engine
            .list_directory(&t.home.join("missing"), IconSize::Normal)
            .is_empty());

        let entries = t.engine.list_directory(&t.home, IconSize::Normal);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Desktop");
    }

    #[test]
    fn test_compress_and_extract_errors() {
        let t = test_engine();
        let notes = t.home.join("Notes");
        fs::create_dir(&notes).unwrap();
        fs::write(t.home.join("Notes.zip"), "").unwrap();

        let archive = t.engine.compress(&[notes], &t.home).unwrap();
        assert_eq!(archive, t.home.join("Notes (2).zip"));

        let err = t.engine.compress(&[], &t.home).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EmptyInputError);

        let rar = t.home.join("a.rar");
        fs::write(&rar, "").unwrap();
        let err = t.engine.extract(&rar, &t.home).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedFormatError);

        let seven = t.home.join("a.7z");
        fs::write(&seven, "").unwrap();
        let err = t.engine.extract(&seven, &t.home).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ToolNotFoundError);
        assert!(err.user_message().contains(app_fs::SEVEN_ZIP_INSTALL_HINT));
    }
}
