//! Routes protocol requests to the engine
//!
//! Engine calls block on the filesystem and external tools, so each request
//! runs on tokio's blocking pool.

use crate::protocol::{Reply, RequestEnvelope, ResponseEnvelope};
use crate::{AppError, Engine, Request, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<Engine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub async fn dispatch(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope { id, request } = envelope;
        let op = request.op_name();
        let engine = Arc::clone(&self.engine);

        tracing::debug!("Dispatching {} ({})", op, id);
        let result = tokio::task::spawn_blocking(move || execute(&engine, request))
            .await
            .unwrap_or_else(|e| Err(AppError::Internal(e.to_string())));

        if let Err(e) = &result {
            tracing::warn!("{} failed: {}", op, e);
        }
        ResponseEnvelope::from_result(id, result)
    }

    /// Parse and dispatch one raw line
    pub async fn dispatch_line(&self, line: &str) -> ResponseEnvelope {
        match RequestEnvelope::parse(line) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(rejected) => {
                tracing::warn!("Rejected request: {}", rejected.error);
                rejected.into()
            }
        }
    }
}

fn execute(engine: &Engine, request: Request) -> Result<Reply> {
    let reply = match request {
        Request::HomeDir => Reply::HomeDir {
            path: engine.home_dir()?,
        },
        Request::OpenPath { path } => {
            engine.open_path(&path)?;
            Reply::Opened
        }
        Request::ListDir { dir, icon_size } => Reply::Entries {
            entries: engine.list_directory(&dir, icon_size),
        },
        Request::MovePath { source, dest_dir } => {
            let moved = engine.move_path(&source, &dest_dir)?;
            Reply::Moved {
                new_path: moved.new_path,
                favorites: moved.favorites,
            }
        }
        Request::CopyPath { source, dest_dir } => Reply::Copied {
            new_path: engine.copy_path(&source, &dest_dir)?,
        },
        Request::RenamePath { path, new_name } => {
            let renamed = engine.rename_path(&path, &new_name)?;
            Reply::Renamed {
                new_path: renamed.new_path,
                favorites: renamed.favorites,
            }
        }
        Request::TrashPath { path } => Reply::Trashed {
            favorites: engine.trash_path(&path)?,
        },
        Request::AddFavorite { path } => Reply::Favorites {
            favorites: engine.add_favorite(&path)?,
        },
        Request::RemoveFavorite { path } => Reply::Favorites {
            favorites: engine.remove_favorite(&path)?,
        },
        Request::RenameFavorite { path, new_name } => {
            let renamed = engine.rename_favorite(&path, &new_name)?;
            Reply::Renamed {
                new_path: renamed.new_path,
                favorites: renamed.favorites,
            }
        }
        Request::GetFavoritesState => Reply::State {
            state: engine.favorites_state(),
        },
        Request::GetSystemFolders => Reply::SystemFolders {
            folders: engine.system_folders(),
        },
        Request::CompleteSetup { keys } => Reply::State {
            state: engine.complete_setup(&keys)?,
        },
        Request::SkipSetup => Reply::State {
            state: engine.skip_setup()?,
        },
        Request::Compress { paths, dest_dir } => Reply::Compressed {
            archive: engine.compress(&paths, &dest_dir)?,
        },
        Request::ExtractArchive { archive, dest_dir } => {
            engine.extract(&archive, &dest_dir)?;
            Reply::Extracted
        }
        Request::GetPreferences => Reply::Preferences {
            prefs: engine.preferences(),
        },
        Request::SetPreferences { patch } => Reply::Preferences {
            prefs: engine.set_preferences(&patch)?,
        },
    };
    Ok(reply)
}
