//! File operations module
//! Provides move, copy, rename, trash and permanent delete

use crate::{validate_basename, CanonicalPath, FsError, PathCatalog, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recoverable-deletion capability (OS trash / recycle bin)
pub trait Recycler: Send + Sync {
    fn recycle(&self, path: &Path) -> Result<()>;
}

/// The platform recycle bin
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Recycler for SystemTrash {
    #[cfg(feature = "trash-support")]
    fn recycle(&self, path: &Path) -> Result<()> {
        trash::delete(path).map_err(|e| FsError::Trash(e.to_string()))
    }

    #[cfg(not(feature = "trash-support"))]
    fn recycle(&self, _path: &Path) -> Result<()> {
        Err(FsError::Trash("Recycle bin support not enabled".to_string()))
    }
}

/// File operations trait
///
/// Every call either completes or leaves the filesystem as it found it, with
/// one exception: a cross-device move that fails after the copy finished but
/// before the source was removed leaves both copies on disk.
pub trait FileOperations: Send + Sync {
    /// Move `source` into `target_dir`, keeping its basename
    fn move_to(&self, source: &Path, target_dir: &Path) -> Result<PathBuf>;

    /// Copy `source` (recursively) into `target_dir`, keeping its basename
    fn copy_to(&self, source: &Path, target_dir: &Path) -> Result<PathBuf>;

    /// Rename `from` in place to `new_name`
    fn rename(&self, from: &Path, new_name: &str) -> Result<PathBuf>;

    /// Send `path` to the recycle bin
    fn trash(&self, path: &Path) -> Result<()>;

    /// Open with the default application
    fn open_external(&self, path: &Path) -> Result<()>;
}

/// Default implementation of file operations
pub struct DefaultFileOperations {
    catalog: PathCatalog,
    recycler: Box<dyn Recycler>,
}

impl DefaultFileOperations {
    pub fn new(catalog: PathCatalog) -> Self {
        Self::with_recycler(catalog, Box::new(SystemTrash))
    }

    pub fn with_recycler(catalog: PathCatalog, recycler: Box<dyn Recycler>) -> Self {
        Self { catalog, recycler }
    }

    fn ensure_unprotected(&self, path: &Path) -> Result<()> {
        if self.catalog.is_protected_path(path) {
            return Err(FsError::ProtectedPath(path.to_path_buf()));
        }
        Ok(())
    }

    /// Resolve `target_dir/basename(source)` and check it is free
    fn destination_for(source: &Path, target_dir: &Path) -> Result<PathBuf> {
        if !path_exists(source) {
            return Err(FsError::NotFound(source.to_path_buf()));
        }

        let metadata =
            fs::metadata(target_dir).map_err(|_| FsError::NotFound(target_dir.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(target_dir.to_path_buf()));
        }

        let file_name = source
            .file_name()
            .ok_or_else(|| FsError::InvalidName(source.display().to_string()))?;
        let target = target_dir.join(file_name);

        if path_exists(&target) {
            return Err(FsError::DestinationExists(target));
        }

        if CanonicalPath::new(&target).is_within(&CanonicalPath::new(source)) {
            return Err(FsError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Cannot place {} inside itself", source.display()),
            )));
        }

        Ok(target)
    }
}

impl Default for DefaultFileOperations {
    fn default() -> Self {
        Self::new(PathCatalog::new())
    }
}

impl FileOperations for DefaultFileOperations {
    fn move_to(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        self.ensure_unprotected(source)?;
        let target = Self::destination_for(source, target_dir)?;

        relocate(source, &target, |from, to| fs::rename(from, to))?;
        Ok(target)
    }

    fn copy_to(&self, source: &Path, target_dir: &Path) -> Result<PathBuf> {
        let target = Self::destination_for(source, target_dir)?;

        if let Err(e) = copy_recursive(source, &target) {
            discard_partial(&target);
            return Err(e);
        }

        tracing::info!("Copied: {} -> {}", source.display(), target.display());
        Ok(target)
    }

    fn rename(&self, from: &Path, new_name: &str) -> Result<PathBuf> {
        self.ensure_unprotected(from)?;
        validate_basename(new_name)?;

        if !path_exists(from) {
            return Err(FsError::NotFound(from.to_path_buf()));
        }

        let parent = from
            .parent()
            .ok_or_else(|| FsError::InvalidName(from.display().to_string()))?;
        let to = parent.join(new_name);

        if path_exists(&to) && !is_case_change(from, &to) {
            return Err(FsError::DestinationExists(to));
        }

        fs::rename(from, &to)?;
        tracing::info!("Renamed: {} -> {}", from.display(), to.display());

        Ok(to)
    }

    fn trash(&self, path: &Path) -> Result<()> {
        self.ensure_unprotected(path)?;

        if !path_exists(path) {
            return Err(FsError::NotFound(path.to_path_buf()));
        }

        self.recycler.recycle(path)?;
        tracing::info!("Moved to trash: {}", path.display());

        Ok(())
    }

    #[cfg(feature = "open-external")]
    fn open_external(&self, path: &Path) -> Result<()> {
        if !path_exists(path) {
            return Err(FsError::NotFound(path.to_path_buf()));
        }

        open::that(path)?;

        tracing::info!("Opened externally: {}", path.display());
        Ok(())
    }

    #[cfg(not(feature = "open-external"))]
    fn open_external(&self, _path: &Path) -> Result<()> {
        Err(FsError::Io(io::Error::new(
            io::ErrorKind::Unsupported,
            "Open external feature not enabled",
        )))
    }
}

/// Rename `source` to `target`, falling back to copy + delete across devices
fn relocate<F>(source: &Path, target: &Path, rename: F) -> Result<()>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    match rename(source, target) {
        Ok(()) => {
            tracing::info!("Moved: {} -> {}", source.display(), target.display());
            Ok(())
        }
        Err(e) if is_cross_device(&e) => {
            tracing::info!(
                "Cross-filesystem move, using copy+delete: {} -> {}",
                source.display(),
                target.display()
            );

            if let Err(e) = copy_recursive(source, target) {
                discard_partial(target);
                return Err(e);
            }

            // From here on a failure leaves both copies in place.
            hard_delete(source)?;
            tracing::info!("Moved (copy+delete): {} -> {}", source.display(), target.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Unix: EXDEV = 18, Windows: ERROR_NOT_SAME_DEVICE = 17
pub fn is_cross_device(e: &io::Error) -> bool {
    match e.raw_os_error() {
        Some(18) => cfg!(unix),
        Some(17) => cfg!(windows),
        _ => false,
    }
}

/// Copy a file or a whole tree.
///
/// Directories are created idempotently; file contents are copied, metadata
/// only as far as `fs::copy` carries it. Symlinks are recreated on Unix, not
/// followed. Uses an explicit work stack, so tree depth is bounded by memory,
/// not by the call stack.
pub fn copy_recursive(src: &Path, dst: &Path) -> Result<()> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        let file_type = fs::symlink_metadata(&from)?.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&to)?;
            for entry in fs::read_dir(&from)? {
                let entry = entry?;
                pending.push((entry.path(), to.join(entry.file_name())));
            }
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let link = fs::read_link(from)?;
    std::os::unix::fs::symlink(link, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

/// Permanently remove a file or tree; a missing path is not an error
pub fn hard_delete(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    tracing::warn!("Permanently deleted: {}", path.display());

    Ok(())
}

/// Best-effort removal of a half-written copy
fn discard_partial(target: &Path) {
    if let Err(e) = hard_delete(target) {
        tracing::warn!("Failed to remove partial copy {}: {}", target.display(), e);
    }
}

fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// `to` differs from `from` only by letter case and resolves to the same
/// entry, as on case-insensitive volumes
fn is_case_change(from: &Path, to: &Path) -> bool {
    let (Some(a), Some(b)) = (from.file_name(), to.file_name()) else {
        return false;
    };
    if a == b || a.to_string_lossy().to_lowercase() != b.to_string_lossy().to_lowercase() {
        return false;
    }
    same_entry(from, to)
}

#[cfg(unix)]
fn same_entry(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => (a.dev(), a.ino()) == (b.dev(), b.ino()),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
