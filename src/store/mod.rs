//! Preference Store
//!
//! Owns the authoritative in-memory tree for one backing file and keeps it in
//! step with disk. Reads and mutations are purely in-memory; only [`save`]
//! touches the shared file, under a cross-process lock, and only [`reload`]
//! observes what other instances saved.
//!
//! [`save`]: PreferenceStore::save
//! [`reload`]: PreferenceStore::reload

pub mod lock;
pub mod persistence;

use crate::error::PrefsResult;
use crate::tree::Node;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

pub use lock::{InterruptFlag, SaveLock};

/// Tuning for the save lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Maximum time a save waits for another writer to release the lock.
    pub lock_timeout: Duration,
    /// Pause between lock attempts.
    pub lock_retry_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5000),
            lock_retry_delay: Duration::from_millis(50),
        }
    }
}

struct State {
    root: Node,
    /// Bumped by every mutation.
    generation: u64,
    /// Generation last written to or read from disk.
    saved_generation: u64,
    /// Modification time of the file as of the last load or save.
    disk_modified: Option<SystemTime>,
}

impl State {
    fn touch(&mut self) {
        self.generation += 1;
    }

    fn mark_clean(&mut self) {
        self.saved_generation = self.generation;
    }
}

/// File-backed preference tree.
///
/// Two stores over the same path are independent in-memory trees; they
/// exchange changes only through `save` and `reload`.
pub struct PreferenceStore {
    path: PathBuf,
    lock_path: PathBuf,
    options: StoreOptions,
    interrupt: InterruptFlag,
    state: RwLock<State>,
    /// Held for a whole save so that snapshots reach disk in order.
    save_gate: Mutex<()>,
}

impl PreferenceStore {
    /// Open the store at `path` with default options, loading it immediately.
    pub fn open(path: impl Into<PathBuf>) -> PrefsResult<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: impl Into<PathBuf>, options: StoreOptions) -> PrefsResult<Self> {
        let path = path.into();
        debug!("Initializing preferences store at {}", path.display());
        let loaded = persistence::read_tree(&path)?;
        Ok(Self {
            lock_path: persistence::lock_path_for(&path),
            path,
            options,
            interrupt: InterruptFlag::new(),
            state: RwLock::new(State {
                root: loaded.root,
                generation: 0,
                saved_generation: 0,
                disk_modified: loaded.modified,
            }),
            save_gate: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Handle that interrupts a save blocked on the lock.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn get(&self, node_path: &str, key: &str) -> Option<String> {
        self.state.read().root.get(node_path, key).map(str::to_string)
    }

    /// Set a value, creating intermediate nodes.
    ///
    /// Fails without mutating anything when a segment of `node_path` holds a
    /// value or when `key` names an existing child node.
    pub fn put(&self, node_path: &str, key: &str, value: &str) -> PrefsResult<()> {
        trace!("Putting value at path '{}', key '{}'", node_path, key);
        let mut state = self.state.write();
        state.root.put(node_path, key, value)?;
        state.touch();
        Ok(())
    }

    /// Remove a value. Missing nodes or keys are ignored.
    pub fn remove(&self, node_path: &str, key: &str) {
        trace!("Removing key '{}' at path '{}'", key, node_path);
        let mut state = self.state.write();
        if state.root.remove(node_path, key) {
            state.touch();
        }
    }

    pub fn keys(&self, node_path: &str) -> Vec<String> {
        self.state
            .read()
            .root
            .lookup(node_path)
            .map(Node::keys)
            .unwrap_or_default()
    }

    pub fn children_names(&self, node_path: &str) -> Vec<String> {
        self.state
            .read()
            .root
            .lookup(node_path)
            .map(Node::child_names)
            .unwrap_or_default()
    }

    pub fn node_exists(&self, node_path: &str) -> bool {
        self.state.read().root.node_exists(node_path)
    }

    /// Remove a whole subtree. The root path clears the entire tree.
    pub fn remove_node(&self, node_path: &str) -> PrefsResult<()> {
        debug!("Removing node at path '{}'", node_path);
        let mut state = self.state.write();
        if state.root.remove_node(node_path)? {
            state.touch();
        }
        Ok(())
    }

    /// Remove every value of one node, keeping its children.
    pub fn clear(&self, node_path: &str) {
        let mut state = self.state.write();
        if state.root.clear_values(node_path) {
            state.touch();
        }
    }

    /// True when the tree holds no values and no nodes.
    pub fn is_empty(&self) -> bool {
        self.state.read().root.is_empty()
    }

    /// True when in-memory changes have not been saved.
    pub fn is_dirty(&self) -> bool {
        let state = self.state.read();
        state.generation != state.saved_generation
    }

    /// Copy of the current in-memory tree.
    pub fn snapshot(&self) -> Node {
        self.state.read().root.clone()
    }

    /// Persist the whole tree.
    ///
    /// An empty tree deletes the backing file instead of writing one.
    /// Otherwise the tree is written to a temp file and renamed over the
    /// target while holding the `<file>.lock` lock, so readers only ever see
    /// a complete file. Saves on one store run one at a time, so a later
    /// save never leaves an older tree on disk.
    pub fn save(&self) -> PrefsResult<()> {
        let _gate = self.save_gate.lock();
        let (bytes, generation) = {
            let state = self.state.read();
            let bytes = if state.root.is_empty() {
                None
            } else {
                Some(state.root.to_json_vec()?)
            };
            (bytes, state.generation)
        };

        let Some(bytes) = bytes else {
            if persistence::remove_if_exists(&self.path)? {
                debug!(
                    "Preferences are empty, deleted {}",
                    self.path.display()
                );
            }
            let mut state = self.state.write();
            state.disk_modified = None;
            state.saved_generation = state.saved_generation.max(generation);
            return Ok(());
        };

        debug!("Saving preferences to {}", self.path.display());
        let started = std::time::Instant::now();
        persistence::ensure_parent_dir(&self.path)?;
        let modified = {
            let _lock = SaveLock::acquire(
                &self.lock_path,
                self.options.lock_timeout,
                self.options.lock_retry_delay,
                &self.interrupt,
            )?;
            persistence::write_atomic(&self.path, &bytes)?
        };

        let mut state = self.state.write();
        state.disk_modified = modified;
        state.saved_generation = state.saved_generation.max(generation);
        trace!(
            "Preferences saved successfully in {} ms",
            started.elapsed().as_millis()
        );
        Ok(())
    }

    /// Replace the in-memory tree with the file's contents, discarding
    /// unsaved changes. A corrupt file is backed up and yields an empty tree.
    pub fn reload(&self) -> PrefsResult<()> {
        debug!("Reloading preferences from {}", self.path.display());
        let loaded = persistence::read_tree(&self.path)?;
        let mut state = self.state.write();
        state.root = loaded.root;
        state.disk_modified = loaded.modified;
        state.touch();
        state.mark_clean();
        Ok(())
    }

    /// Reload only if the file changed since the last load or save.
    ///
    /// Returns whether a reload happened.
    pub fn refresh(&self) -> PrefsResult<bool> {
        let current = persistence::modified_time(&self.path)?;
        if current == self.state.read().disk_modified {
            trace!("File has not been modified, skipping reload");
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Delete the backing file and its lock file, and clear the tree.
    pub fn delete(&self) -> PrefsResult<()> {
        debug!("Deleting preferences file {}", self.path.display());
        persistence::remove_if_exists(&self.path)?;
        persistence::remove_if_exists(&self.lock_path)?;
        let mut state = self.state.write();
        state.root = Node::new();
        state.disk_modified = None;
        state.touch();
        state.mark_clean();
        Ok(())
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("path", &self.path)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
