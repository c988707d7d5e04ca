//! Legacy preference backends the migrator reads from.

use super::TruncationLimits;
use crate::tree::path;
use indexmap::IndexMap;

/// Error type returned by legacy backends.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Read-only view of a legacy hierarchical key/value backend.
///
/// Paths use the store convention: `""` is the root, segments are joined
/// with `/`. Unlike the store, a legacy node may hold a value and a child
/// node under the same name.
pub trait LegacySource {
    fn children_names(&self, node_path: &str) -> Result<Vec<String>, SourceError>;

    fn keys(&self, node_path: &str) -> Result<Vec<String>, SourceError>;

    fn get(&self, node_path: &str, key: &str) -> Result<Option<String>, SourceError>;

    /// Hard limits past which the backend silently truncates.
    fn limits(&self) -> TruncationLimits {
        TruncationLimits::default()
    }
}

#[derive(Debug, Default, Clone)]
struct LegacyNode {
    values: IndexMap<String, String>,
    children: IndexMap<String, LegacyNode>,
}

/// In-process legacy tree that truncates keys and values the way the
/// legacy backend does.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLegacySource {
    root: LegacyNode,
    limits: TruncationLimits,
}

impl InMemoryLegacySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: TruncationLimits) -> Self {
        Self {
            root: LegacyNode::default(),
            limits,
        }
    }

    /// Store a value, truncating key and value to the configured limits.
    pub fn put(&mut self, node_path: &str, key: &str, value: &str) -> &mut Self {
        let key = truncate_chars(key, self.limits.max_key_length);
        let value = truncate_chars(value, self.limits.max_value_length);
        self.node_mut(node_path).values.insert(key, value);
        self
    }

    /// Create an (empty) node.
    pub fn add_node(&mut self, node_path: &str) -> &mut Self {
        self.node_mut(node_path);
        self
    }

    fn node_mut(&mut self, node_path: &str) -> &mut LegacyNode {
        let mut current = &mut self.root;
        for segment in node_path.split(path::SEPARATOR).filter(|s| !s.is_empty()) {
            current = current.children.entry(segment.to_string()).or_default();
        }
        current
    }

    fn node(&self, node_path: &str) -> Option<&LegacyNode> {
        let mut current = &self.root;
        for segment in node_path.split(path::SEPARATOR).filter(|s| !s.is_empty()) {
            current = current.children.get(segment)?;
        }
        Some(current)
    }
}

impl LegacySource for InMemoryLegacySource {
    fn children_names(&self, node_path: &str) -> Result<Vec<String>, SourceError> {
        Ok(self
            .node(node_path)
            .map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn keys(&self, node_path: &str) -> Result<Vec<String>, SourceError> {
        Ok(self
            .node(node_path)
            .map(|node| node.values.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, node_path: &str, key: &str) -> Result<Option<String>, SourceError> {
        Ok(self
            .node(node_path)
            .and_then(|node| node.values.get(key).cloned()))
    }

    fn limits(&self) -> TruncationLimits {
        self.limits
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
