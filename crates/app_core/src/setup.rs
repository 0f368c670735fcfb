//! First-run onboarding: seed favorites from the system folders

use crate::{FavoriteRecord, FavoritesStore, PersistedState, Result};
use app_fs::{CanonicalPath, PathCatalog, SystemFolder};

pub struct SetupCoordinator<'a> {
    store: &'a FavoritesStore,
    catalog: &'a PathCatalog,
}

impl<'a> SetupCoordinator<'a> {
    pub fn new(store: &'a FavoritesStore, catalog: &'a PathCatalog) -> Self {
        Self { store, catalog }
    }

    /// Favorite each selected system folder that exists, then mark setup done.
    /// Unknown keys and missing folders are skipped.
    pub fn complete_with_selections<S: AsRef<str>>(&self, keys: &[S]) -> Result<PersistedState> {
        let records: Vec<FavoriteRecord> = keys
            .iter()
            .filter_map(|key| {
                let key = key.as_ref();
                let Some(folder) = SystemFolder::from_key(key) else {
                    tracing::warn!("Ignoring unknown system folder key {:?}", key);
                    return None;
                };
                self.catalog.descriptor(folder).filter(|d| d.exists)
            })
            .map(|d| FavoriteRecord {
                path: CanonicalPath::new(&d.path).into_path_buf(),
                label: d.label,
                glyph: d.glyph,
            })
            .collect();

        let state = self.store.update(|state| {
            for record in records {
                state.insert(record);
            }
            state.setup_completed = true;
            true
        })?;

        tracing::info!("Setup completed with {} favorites", state.items.len());
        Ok(state)
    }

    /// Mark setup done without adding anything
    pub fn skip(&self) -> Result<PersistedState> {
        let state = self.store.update(|state| {
            state.setup_completed = true;
            true
        })?;
        tracing::info!("Setup skipped");
        Ok(state)
    }
}
