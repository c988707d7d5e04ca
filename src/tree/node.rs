//! Preference tree nodes.
//!
//! A node keeps scalar values and child nodes in one ordered namespace, the
//! same way the serialized JSON object does: a name is either a string value
//! or a nested object, never both.

use crate::error::{PrefsError, PrefsResult};
use crate::tree::path;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Marker key flagging node objects in documents that tag their nodes.
///
/// When a document carries the marker anywhere, objects without it are
/// stored JSON values rather than child nodes.
const NODE_MARKER: &str = ".node";

/// One slot in a node's namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Value(String),
    Node(Node),
}

/// One level of the preference tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Node {
    entries: IndexMap<String, Entry>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the node holds neither values nor children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Entry::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        match self.entries.get(name) {
            Some(Entry::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// Value keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Value(_)))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Child node names in insertion order.
    pub fn child_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Node(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Find the node at a store path without creating anything.
    pub fn lookup(&self, node_path: &str) -> Option<&Node> {
        let segments = path::segments(node_path).ok()?;
        let mut current = self;
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// True for the root and for any reachable node that is not empty.
    pub fn node_exists(&self, node_path: &str) -> bool {
        if node_path.is_empty() {
            return true;
        }
        self.lookup(node_path).is_some_and(|node| !node.is_empty())
    }

    pub fn get(&self, node_path: &str, key: &str) -> Option<&str> {
        self.lookup(node_path)?.value(key)
    }

    /// Set `key` to `value` in the node at `node_path`, creating missing nodes.
    ///
    /// Nodes are only created after every existing segment has been checked,
    /// and a freshly created node is empty, so a rejected write never leaves
    /// partial structure behind.
    pub fn put(&mut self, node_path: &str, key: &str, value: &str) -> PrefsResult<()> {
        let segments = path::segments(node_path)?;
        let mut current = self;
        for (depth, segment) in segments.iter().enumerate() {
            current = match current
                .entries
                .entry((*segment).to_string())
                .or_insert_with(|| Entry::Node(Node::default()))
            {
                Entry::Node(node) => node,
                Entry::Value(_) => {
                    let conflict = segments[..=depth].join("/");
                    tracing::error!(
                        "Cannot create node '{}' at path '{}' because a value already exists",
                        segment,
                        node_path
                    );
                    return Err(PrefsError::NodeConflict {
                        path: conflict,
                        segment: (*segment).to_string(),
                    });
                }
            };
        }

        match current.entries.get_mut(key) {
            Some(Entry::Node(_)) => {
                tracing::error!(
                    "Cannot set value '{}' at path '{}' because a node already exists",
                    key,
                    node_path
                );
                Err(PrefsError::ValueConflict {
                    path: path::join(node_path, key),
                    key: key.to_string(),
                })
            }
            Some(Entry::Value(existing)) => {
                *existing = value.to_string();
                Ok(())
            }
            None => {
                current
                    .entries
                    .insert(key.to_string(), Entry::Value(value.to_string()));
                Ok(())
            }
        }
    }

    /// Remove a value; returns whether anything was removed.
    ///
    /// Nodes left empty along the path are pruned.
    pub fn remove(&mut self, node_path: &str, key: &str) -> bool {
        match path::segments(node_path) {
            Ok(segments) => self.remove_value_at(&segments, key),
            Err(_) => false,
        }
    }

    /// Remove the subtree at `node_path`; the root path clears everything.
    pub fn remove_node(&mut self, node_path: &str) -> PrefsResult<bool> {
        let segments = path::segments(node_path)?;
        if segments.is_empty() {
            let removed = !self.entries.is_empty();
            self.entries.clear();
            return Ok(removed);
        }
        Ok(self.remove_child_at(&segments))
    }

    /// Remove every value of the node at `node_path`, keeping its children.
    pub fn clear_values(&mut self, node_path: &str) -> bool {
        let keys = match self.lookup(node_path) {
            Some(node) => node.keys(),
            None => return false,
        };
        let mut removed = false;
        for key in keys {
            removed |= self.remove(node_path, &key);
        }
        removed
    }

    fn remove_value_at(&mut self, segments: &[&str], key: &str) -> bool {
        match segments.split_first() {
            None => {
                if matches!(self.entries.get(key), Some(Entry::Value(_))) {
                    self.entries.shift_remove(key);
                    true
                } else {
                    false
                }
            }
            Some((first, rest)) => {
                let Some(Entry::Node(child)) = self.entries.get_mut(*first) else {
                    return false;
                };
                let removed = child.remove_value_at(rest, key);
                if removed && child.is_empty() {
                    self.entries.shift_remove(*first);
                }
                removed
            }
        }
    }

    fn remove_child_at(&mut self, segments: &[&str]) -> bool {
        match segments.split_first() {
            None => false,
            Some((last, [])) => {
                if matches!(self.entries.get(*last), Some(Entry::Node(_))) {
                    self.entries.shift_remove(*last);
                    true
                } else {
                    false
                }
            }
            Some((first, rest)) => {
                let Some(Entry::Node(child)) = self.entries.get_mut(*first) else {
                    return false;
                };
                let removed = child.remove_child_at(rest);
                if removed && child.is_empty() {
                    self.entries.shift_remove(*first);
                }
                removed
            }
        }
    }

    /// Parse a serialized tree. The document must be a JSON object.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Node, serde_json::Error> {
        let raw: IndexMap<String, RawEntry> = serde_json::from_slice(bytes)?;
        let marked = uses_node_markers(&raw);
        Ok(Node::from_raw(raw, marked))
    }

    /// Pretty-printed JSON document for this tree.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    fn from_raw(raw: IndexMap<String, RawEntry>, marked: bool) -> Node {
        let mut node = Node::default();
        for (key, entry) in raw {
            match entry {
                RawEntry::Text(value) => {
                    node.entries.insert(key, Entry::Value(value));
                }
                RawEntry::Object(children) if marked && !is_marked_node(&children) => {
                    let text = RawEntry::Object(children).into_value().to_string();
                    node.entries.insert(key, Entry::Value(text));
                }
                RawEntry::Object(children) => {
                    let child = Node::from_raw(children, marked);
                    if !child.is_empty() {
                        node.entries.insert(key, Entry::Node(child));
                    }
                }
                RawEntry::Other(serde_json::Value::Null) => {}
                RawEntry::Other(serde_json::Value::Bool(_)) if key == NODE_MARKER => {}
                RawEntry::Other(other) => {
                    node.entries.insert(key, Entry::Value(other.to_string()));
                }
            }
        }
        node
    }
}

/// Lenient shape of a stored entry before normalisation.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Text(String),
    Object(IndexMap<String, RawEntry>),
    Other(serde_json::Value),
}

impl RawEntry {
    fn into_value(self) -> serde_json::Value {
        match self {
            RawEntry::Text(text) => serde_json::Value::String(text),
            RawEntry::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, entry)| (key, entry.into_value()))
                    .collect(),
            ),
            RawEntry::Other(value) => value,
        }
    }
}

fn is_marked_node(object: &IndexMap<String, RawEntry>) -> bool {
    matches!(
        object.get(NODE_MARKER),
        Some(RawEntry::Other(serde_json::Value::Bool(true)))
    )
}

/// True when any object below `raw` carries the node marker.
fn uses_node_markers(raw: &IndexMap<String, RawEntry>) -> bool {
    raw.values().any(|entry| match entry {
        RawEntry::Object(children) => is_marked_node(children) || uses_node_markers(children),
        _ => false,
    })
}
