//! Hierarchical preference nodes.
//!
//! A [`PreferenceNode`] is a lightweight handle (a shared store plus an
//! absolute path) that navigates the tree like a directory of settings. It
//! caches nothing, so a change made through one handle is visible through
//! every other handle over the same store.

use crate::error::{PrefsError, PrefsResult};
use crate::store::PreferenceStore;
use crate::tree::path;
use std::sync::Arc;

#[derive(Clone)]
pub struct PreferenceNode {
    store: Arc<PreferenceStore>,
    /// Store path, `""` for the root.
    path: String,
}

impl PreferenceNode {
    /// Root node over `store`.
    pub fn root(store: Arc<PreferenceStore>) -> Self {
        Self {
            store,
            path: String::new(),
        }
    }

    /// Handle for `relative`, resolved against this node.
    ///
    /// Accepts multi-segment paths (`"a/b/c"`) and absolute paths (`"/a"`).
    /// Nothing is created until a value is written.
    pub fn node(&self, relative: &str) -> PrefsResult<PreferenceNode> {
        Ok(Self {
            store: Arc::clone(&self.store),
            path: path::resolve(&self.path, relative)?,
        })
    }

    pub fn parent(&self) -> Option<PreferenceNode> {
        path::parent(&self.path).map(|parent| Self {
            store: Arc::clone(&self.store),
            path: parent.to_string(),
        })
    }

    /// Last path segment, `""` for the root.
    pub fn name(&self) -> &str {
        path::name(&self.path)
    }

    /// Canonical `/`-rooted path; the root is `"/"`.
    pub fn absolute_path(&self) -> String {
        path::absolute(&self.path)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn store(&self) -> &Arc<PreferenceStore> {
        &self.store
    }

    pub fn put(&self, key: &str, value: &str) -> PrefsResult<()> {
        self.store.put(&self.path, key, value)
    }

    pub fn get(&self, key: &str, default: &str) -> String {
        self.get_opt(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_opt(&self, key: &str) -> Option<String> {
        self.store.get(&self.path, key)
    }

    pub fn remove(&self, key: &str) {
        self.store.remove(&self.path, key)
    }

    /// Remove every value of this node; child nodes are kept.
    pub fn clear(&self) {
        self.store.clear(&self.path)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.keys(&self.path)
    }

    pub fn children_names(&self) -> Vec<String> {
        self.store.children_names(&self.path)
    }

    /// Whether the node at `relative` currently holds anything (the root
    /// always exists).
    pub fn node_exists(&self, relative: &str) -> PrefsResult<bool> {
        let target = path::resolve(&self.path, relative)?;
        Ok(self.store.node_exists(&target))
    }

    /// Delete this node's whole subtree. The root cannot be removed.
    pub fn remove_node(&self) -> PrefsResult<()> {
        if self.is_root() {
            return Err(PrefsError::RootRemoval);
        }
        self.store.remove_node(&self.path)
    }

    /// Persist the whole store.
    pub fn flush(&self) -> PrefsResult<()> {
        self.store.save()
    }

    /// Pull the on-disk state, discarding unsaved local changes.
    pub fn sync(&self) -> PrefsResult<()> {
        self.store.reload()
    }

    pub fn put_bool(&self, key: &str, value: bool) -> PrefsResult<()> {
        self.put(key, if value { "true" } else { "false" })
    }

    /// Stored boolean, or `default` when absent or not `true`/`false`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_opt(key).as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            _ => default,
        }
    }

    pub fn put_i64(&self, key: &str, value: i64) -> PrefsResult<()> {
        self.put(key, &value.to_string())
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get_opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn put_f64(&self, key: &str, value: f64) -> PrefsResult<()> {
        self.put(key, &value.to_string())
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get_opt(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

impl std::fmt::Debug for PreferenceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceNode")
            .field("path", &self.absolute_path())
            .field("file", &self.store.path())
            .finish()
    }
}
