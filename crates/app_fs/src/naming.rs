//! Basename validation and display labels

use crate::{FsError, Result};

/// Characters that would turn a basename into a path
const SEPARATORS: &[char] = &['/', '\\'];

/// Check that `name` can be used as a single path component.
///
/// Rejects the empty string, `.`, `..`, anything containing a path
/// separator (either style, on every platform) and NUL.
pub fn validate_basename(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::InvalidName(name.to_string()));
    }

    if name.contains(SEPARATORS) || name.contains('\0') {
        return Err(FsError::InvalidName(name.to_string()));
    }

    Ok(())
}

/// Display label for an entry name.
///
/// With `show_extensions` off, a file's last extension is stripped; folder
/// names and dotfiles without another dot are left alone.
pub fn display_name(name: &str, is_dir: bool, show_extensions: bool) -> String {
    if show_extensions || is_dir {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name.to_string(),
    }
}
