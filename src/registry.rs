//! Named preference files
//!
//! A registry maps file names to shared [`PreferenceStore`]s inside one
//! directory, so every caller asking for `"user"` sees the same in-memory tree.

use crate::config::{paths, ConfigLoader};
use crate::error::{PrefsError, PrefsResult};
use crate::preferences::PreferenceNode;
use crate::store::{persistence, PreferenceStore, StoreOptions};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Name of the file backing [`PreferenceRegistry::user_root`].
pub const USER_FILE: &str = "user";

const FILE_EXTENSION: &str = "json";

pub struct PreferenceRegistry {
    dir: PathBuf,
    options: StoreOptions,
    stores: RwLock<HashMap<String, Arc<PreferenceStore>>>,
}

impl PreferenceRegistry {
    pub fn new(dir: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            dir: dir.into(),
            options,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `name`.
    pub fn file_path(&self, name: &str) -> PrefsResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.{}", name, FILE_EXTENSION)))
    }

    /// Root node of the preference file `name`, loading it on first use.
    pub fn file(&self, name: &str) -> PrefsResult<PreferenceNode> {
        Ok(PreferenceNode::root(self.store(name)?))
    }

    /// Root node of the default user file.
    pub fn user_root(&self) -> PrefsResult<PreferenceNode> {
        self.file(USER_FILE)
    }

    /// Delete the file `name` and forget its cached store.
    ///
    /// Nodes obtained earlier keep working against their now detached store.
    pub fn delete(&self, name: &str) -> PrefsResult<()> {
        let path = self.file_path(name)?;
        let cached = self.stores.write().remove(name);
        match cached {
            Some(store) => store.delete(),
            None => {
                debug!("Deleting preference file {}", path.display());
                persistence::remove_if_exists(&path)?;
                persistence::remove_if_exists(&persistence::lock_path_for(&path))?;
                Ok(())
            }
        }
    }

    fn store(&self, name: &str) -> PrefsResult<Arc<PreferenceStore>> {
        let path = self.file_path(name)?;
        {
            let stores = self.stores.read();
            if let Some(store) = stores.get(name) {
                return Ok(store.clone());
            }
        }

        let mut stores = self.stores.write();
        // Another thread may have opened it while we waited for the write lock
        if let Some(store) = stores.get(name) {
            return Ok(store.clone());
        }
        debug!("Opening preference file {}", path.display());
        let store = Arc::new(PreferenceStore::open_with(path, self.options.clone())?);
        stores.insert(name.to_string(), store.clone());
        Ok(store)
    }
}

impl std::fmt::Debug for PreferenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceRegistry")
            .field("dir", &self.dir)
            .field("options", &self.options)
            .field("open", &self.stores.read().len())
            .finish()
    }
}

fn validate_name(name: &str) -> PrefsResult<()> {
    if name.trim().is_empty() {
        return Err(PrefsError::InvalidName {
            name: name.to_string(),
            reason: "must not be blank".to_string(),
        });
    }
    if name.contains(['/', '\\']) {
        return Err(PrefsError::InvalidName {
            name: name.to_string(),
            reason: "must not contain path separators".to_string(),
        });
    }
    Ok(())
}

static GLOBAL: OnceLock<PreferenceRegistry> = OnceLock::new();

/// Process-wide registry built from the layered configuration.
///
/// The first successful call fixes the directory and options for the rest
/// of the process.
pub fn global() -> PrefsResult<&'static PreferenceRegistry> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let config = ConfigLoader::load()?;
    let dir = match config.store.directory.clone() {
        Some(dir) => dir,
        None => paths::preferences_dir()?,
    };
    Ok(GLOBAL.get_or_init(|| PreferenceRegistry::new(dir, config.store.options())))
}
