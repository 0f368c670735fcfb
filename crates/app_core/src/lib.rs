//! Foldermark Core Domain Logic
//!
//! This crate contains:
//! - Error types and their wire-level kinds
//! - Configuration
//! - Favorites store and first-run setup
//! - Engine facade sequencing filesystem operations and favorites updates
//! - Host protocol and async dispatcher

pub mod config;
pub mod error;
pub mod favorites;
pub mod setup;
pub mod engine;
pub mod protocol;
pub mod dispatcher;

pub use config::{ArchiveConfig, EngineConfig, LoggingConfig, StorageConfig};
pub use error::{AppError, ErrorKind, Result};
pub use favorites::{
    FavoriteRecord, FavoritesStore, PersistedState, Preferences, PreferencesPatch, DEFAULT_GLYPH,
};
pub use setup::SetupCoordinator;
pub use engine::{Engine, Relocation};
pub use protocol::{Event, Reply, Request, RequestEnvelope, ResponseEnvelope};
pub use dispatcher::Dispatcher;
