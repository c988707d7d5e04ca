use crate::integration::support::{open_store, store_path};
use prefstore::PrefsError;
use proptest::prelude::*;
use tempfile::TempDir;

#[test]
fn child_node_cannot_shadow_value() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&store_path(&dir));

    store.put("", "foo", "x").unwrap();
    let err = store.put("foo", "bar", "y").unwrap_err();
    assert!(err.is_structural());
    assert!(matches!(err, PrefsError::NodeConflict { .. }));
    assert_eq!(store.get("", "foo"), Some("x".to_string()));
    assert!(!store.node_exists("foo"));
}

#[test]
fn value_cannot_shadow_child_node() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&store_path(&dir));

    store.put("foo", "bar", "y").unwrap();
    let err = store.put("", "foo", "x").unwrap_err();
    assert!(matches!(err, PrefsError::ValueConflict { .. }));
    assert_eq!(store.get("foo", "bar"), Some("y".to_string()));
    assert_eq!(store.get("", "foo"), None);
}

#[test]
fn rejected_put_is_not_a_change() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&store_path(&dir));

    store.put("", "foo", "x").unwrap();
    store.save().unwrap();
    assert!(store.put("foo/deeper", "bar", "y").is_err());
    assert!(!store.is_dirty());
}

#[test]
fn malformed_paths_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&store_path(&dir));

    for bad in ["a//b", "/a", "a/"] {
        let err = store.put(bad, "k", "v").unwrap_err();
        assert!(matches!(err, PrefsError::InvalidPath { .. }), "{}", bad);
    }
    assert!(store.is_empty());
}

#[test]
fn remove_node_on_root_clears_everything() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&store_path(&dir));

    store.put("", "a", "1").unwrap();
    store.put("b/c", "d", "2").unwrap();
    store.remove_node("").unwrap();
    assert!(store.is_empty());
    assert!(store.node_exists(""));
}

#[test]
fn clear_keeps_child_nodes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&store_path(&dir));

    store.put("ui", "theme", "dark").unwrap();
    store.put("ui/window", "width", "800").unwrap();
    store.clear("ui");
    assert!(store.keys("ui").is_empty());
    assert_eq!(store.children_names("ui"), vec!["window"]);
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,6}"
}

fn node_path() -> impl Strategy<Value = String> {
    prop::collection::vec(name(), 0..3).prop_map(|parts| parts.join("/"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn value_blocks_child_node_until_removed(
        parent in node_path(),
        key in name(),
        inner in name(),
        v1 in "\\PC{0,10}",
        v2 in "\\PC{0,10}",
    ) {
        let dir = TempDir::new().unwrap();
        let store = open_store(&store_path(&dir));
        let child = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}/{}", parent, key)
        };

        store.put(&parent, &key, &v1).unwrap();
        let err = store.put(&child, &inner, &v2).unwrap_err();
        prop_assert!(err.is_structural());
        prop_assert_eq!(store.get(&parent, &key), Some(v1.clone()));

        store.remove(&parent, &key);
        store.put(&child, &inner, &v2).unwrap();
        prop_assert_eq!(store.get(&child, &inner), Some(v2));
        prop_assert_eq!(store.get(&parent, &key), None);
    }
}
