//! Host protocol: one JSON object per line in each direction
//!
//! Requests carry an `id` and an `op`; every response echoes the `id`.
//! Preference changes are pushed as unsolicited events.

use crate::{AppError, ErrorKind, FavoriteRecord, PersistedState, Preferences, PreferencesPatch, Result};
use app_fs::{DirectoryEntry, IconSize, SystemFolderDescriptor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Operations the host accepts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    HomeDir,
    OpenPath {
        path: PathBuf,
    },
    ListDir {
        dir: PathBuf,
        #[serde(default)]
        icon_size: IconSize,
    },
    MovePath {
        source: PathBuf,
        dest_dir: PathBuf,
    },
    CopyPath {
        source: PathBuf,
        dest_dir: PathBuf,
    },
    RenamePath {
        path: PathBuf,
        new_name: String,
    },
    TrashPath {
        path: PathBuf,
    },
    AddFavorite {
        path: PathBuf,
    },
    RemoveFavorite {
        path: PathBuf,
    },
    RenameFavorite {
        path: PathBuf,
        new_name: String,
    },
    GetFavoritesState,
    GetSystemFolders,
    CompleteSetup {
        #[serde(default)]
        keys: Vec<String>,
    },
    SkipSetup,
    Compress {
        paths: Vec<PathBuf>,
        dest_dir: PathBuf,
    },
    ExtractArchive {
        archive: PathBuf,
        dest_dir: PathBuf,
    },
    GetPreferences,
    SetPreferences {
        #[serde(default)]
        patch: PreferencesPatch,
    },
}

impl Request {
    /// Wire name of the operation, for logging
    pub fn op_name(&self) -> &'static str {
        match self {
            Request::HomeDir => "homeDir",
            Request::OpenPath { .. } => "openPath",
            Request::ListDir { .. } => "listDir",
            Request::MovePath { .. } => "movePath",
            Request::CopyPath { .. } => "copyPath",
            Request::RenamePath { .. } => "renamePath",
            Request::TrashPath { .. } => "trashPath",
            Request::AddFavorite { .. } => "addFavorite",
            Request::RemoveFavorite { .. } => "removeFavorite",
            Request::RenameFavorite { .. } => "renameFavorite",
            Request::GetFavoritesState => "getFavoritesState",
            Request::GetSystemFolders => "getSystemFolders",
            Request::CompleteSetup { .. } => "completeSetup",
            Request::SkipSetup => "skipSetup",
            Request::Compress { .. } => "compress",
            Request::ExtractArchive { .. } => "extractArchive",
            Request::GetPreferences => "getPreferences",
            Request::SetPreferences { .. } => "setPreferences",
        }
    }
}

/// A request line that could not be understood
#[derive(Debug)]
pub struct Rejected {
    /// Nil when the line carried no usable id
    pub id: Uuid,
    pub error: AppError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub id: Uuid,
    pub request: Request,
}

impl RequestEnvelope {
    pub fn new(request: Request) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
        }
    }

    /// Parse one request line; the id is recovered even when the op is bad
    pub fn parse(line: &str) -> std::result::Result<Self, Rejected> {
        let value: serde_json::Value = serde_json::from_str(line).map_err(|e| Rejected {
            id: Uuid::nil(),
            error: AppError::InvalidRequest(e.to_string()),
        })?;

        let id = value
            .get("id")
            .and_then(|v| serde_json::from_value::<Uuid>(v.clone()).ok())
            .unwrap_or_else(Uuid::nil);

        let request = serde_json::from_value::<Request>(value).map_err(|e| Rejected {
            id,
            error: AppError::InvalidRequest(e.to_string()),
        })?;

        Ok(Self { id, request })
    }
}

/// Payload of a response, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Reply {
    HomeDir {
        path: PathBuf,
    },
    Opened,
    Entries {
        entries: Vec<DirectoryEntry>,
    },
    Moved {
        new_path: PathBuf,
        favorites: Vec<FavoriteRecord>,
    },
    Copied {
        new_path: PathBuf,
    },
    Renamed {
        new_path: PathBuf,
        favorites: Vec<FavoriteRecord>,
    },
    Trashed {
        favorites: Vec<FavoriteRecord>,
    },
    Favorites {
        favorites: Vec<FavoriteRecord>,
    },
    State {
        state: PersistedState,
    },
    SystemFolders {
        folders: Vec<SystemFolderDescriptor>,
    },
    Compressed {
        archive: PathBuf,
    },
    Extracted,
    Preferences {
        prefs: Preferences,
    },
    Error {
        code: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseEnvelope {
    pub id: Uuid,
    pub ok: bool,
    #[serde(flatten)]
    pub reply: Reply,
}

impl ResponseEnvelope {
    pub fn from_result(id: Uuid, result: Result<Reply>) -> Self {
        match result {
            Ok(reply) => Self { id, ok: true, reply },
            Err(e) => Self::error(id, &e),
        }
    }

    pub fn error(id: Uuid, err: &AppError) -> Self {
        Self {
            id,
            ok: false,
            reply: Reply::Error {
                code: err.kind(),
                message: err.user_message(),
            },
        }
    }

    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AppError::Internal(e.to_string()))
    }
}

impl From<Rejected> for ResponseEnvelope {
    fn from(rejected: Rejected) -> Self {
        Self::error(rejected.id, &rejected.error)
    }
}

/// Unsolicited notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    PrefsChanged { prefs: Preferences },
}

impl Event {
    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AppError::Internal(e.to_string()))
    }
}
