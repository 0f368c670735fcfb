//! CanonicalPath - lexical path normalization for equality checks

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// An absolute, lexically normalized path
///
/// `.` and `..` components are resolved without touching the disk, so paths
/// that no longer exist (a trashed folder, a stale favorite) still compare
/// correctly. Symlinks are not resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(PathBuf);

impl CanonicalPath {
    /// Create a new CanonicalPath from any path-like type
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self(Self::normalize_path(path.as_ref()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// True if `self` equals `ancestor` or lies below it
    pub fn is_within(&self, ancestor: &CanonicalPath) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Re-root `self` from `from` onto `to`; `None` if `self` is not under `from`
    pub fn rebase(&self, from: &CanonicalPath, to: &CanonicalPath) -> Option<CanonicalPath> {
        let rest = self.0.strip_prefix(&from.0).ok()?;
        if rest.as_os_str().is_empty() {
            Some(to.clone())
        } else {
            Some(CanonicalPath(to.0.join(rest)))
        }
    }

    fn normalize_path(path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        };

        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::CurDir => {}
                _ => normalized.push(component),
            }
        }
        normalized
    }
}

impl AsRef<Path> for CanonicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for CanonicalPath {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for CanonicalPath {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl std::fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
