//! Application error types

use app_fs::FsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds reported across the host boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFoundError,
    NotADirectoryError,
    ProtectedPathError,
    InvalidNameError,
    DestinationExistsError,
    EmptyInputError,
    UnsupportedFormatError,
    ToolNotFoundError,
    #[serde(rename = "IOError")]
    IoError,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot write favorites state: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Fs(e) => match e {
                FsError::NotFound(_) => ErrorKind::NotFoundError,
                FsError::NotADirectory(_) => ErrorKind::NotADirectoryError,
                FsError::ProtectedPath(_) => ErrorKind::ProtectedPathError,
                FsError::InvalidName(_) => ErrorKind::InvalidNameError,
                FsError::DestinationExists(_) => ErrorKind::DestinationExistsError,
                FsError::EmptyInput => ErrorKind::EmptyInputError,
                FsError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormatError,
                FsError::ToolNotFound { .. } => ErrorKind::ToolNotFoundError,
                FsError::ToolFailed { .. } | FsError::Trash(_) | FsError::Io(_) => {
                    ErrorKind::IoError
                }
            },
            AppError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFoundError,
            _ => ErrorKind::IoError,
        }
    }

    /// Message shown to the user; keeps the underlying cause intact
    pub fn user_message(&self) -> String {
        match self {
            AppError::Fs(FsError::Io(e)) => e.to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::State(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
