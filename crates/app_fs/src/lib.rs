//! Foldermark File System Layer
//!
//! Everything that touches the disk lives here:
//! - CanonicalPath: lexical path normalization used for equality checks
//! - PathCatalog: well-known system folders and protection checks
//! - DirectoryReader: sorted directory listings with pluggable icons
//! - File operations: move, copy, rename, trash, hard delete
//! - ArchiveBridge: zip / 7z through external tools
//!
//! This crate holds no persisted state; favorites live in `app_core`.

mod canonical_path;
mod catalog;
mod browser;
mod naming;
mod file_operations;
mod archive;

pub use canonical_path::CanonicalPath;
pub use catalog::{PathCatalog, SystemFolder, SystemFolderDescriptor};
pub use browser::{DirectoryEntry, DirectoryReader, IconHandle, IconProvider, IconSize, NoIcons};
pub use naming::{display_name, validate_basename};
pub use file_operations::{
    copy_recursive, hard_delete, is_cross_device, DefaultFileOperations, FileOperations,
    Recycler, SystemTrash,
};
pub use archive::{
    unique_archive_name, ArchiveBridge, ArchiveFormat, ArchiveTool, SevenZipTool, ZipTool,
    SEVEN_ZIP_INSTALL_HINT,
};

use std::path::PathBuf;
use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot modify a system folder: {}", .0.display())]
    ProtectedPath(PathBuf),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("No paths to compress")]
    EmptyInput,

    #[error("Unsupported archive type: {0}")]
    UnsupportedFormat(String),

    #[error("{tool} not found. {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// Non-zero exit of an external tool; `message` is its stderr verbatim.
    #[error("{message}")]
    ToolFailed { tool: String, message: String },

    #[error("Trash error: {0}")]
    Trash(String),
}

pub type Result<T> = std::result::Result<T, FsError>;
