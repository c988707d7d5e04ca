use crate::integration::support::{backups, fast_options, open_store, store_path, temp_files};
use prefstore::tree::Node;
use prefstore::PreferenceStore;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn dotted_key_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let store = open_store(&path);
    store.put("", "a.b", "v").unwrap();
    store.save().unwrap();

    let reopened = open_store(&path);
    assert_eq!(reopened.get("", "a.b"), Some("v".to_string()));
    assert!(reopened.children_names("").is_empty());
}

#[test]
fn saved_file_is_plain_nested_json() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let store = open_store(&path);
    store.put("", "theme", "dark").unwrap();
    store.put("window/main", "width", "800").unwrap();
    store.save().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({
            "theme": "dark",
            "window": { "main": { "width": "800" } }
        })
    );
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn hand_edited_scalars_load_as_text() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    fs::write(
        &path,
        r#"{"count": 3, "enabled": true, "gone": null, "ui": {"scale": 1.5}}"#,
    )
    .unwrap();

    let store = open_store(&path);
    assert_eq!(store.get("", "count"), Some("3".to_string()));
    assert_eq!(store.get("", "enabled"), Some("true".to_string()));
    assert_eq!(store.get("", "gone"), None);
    assert_eq!(store.get("ui", "scale"), Some("1.5".to_string()));
    assert!(backups(&path).is_empty());
}

#[test]
fn valid_file_produces_no_backup() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    fs::write(&path, r#"{"a": "1", "b": {"c": "2"}}"#).unwrap();

    let store = open_store(&path);
    assert_eq!(store.get("", "a"), Some("1".to_string()));
    assert_eq!(store.get("b", "c"), Some("2".to_string()));
    assert!(backups(&path).is_empty());
    assert!(!store.is_dirty());
}

#[test]
fn empty_tree_never_creates_file() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let store = open_store(&path);
    store.save().unwrap();
    assert!(!path.exists());

    store.put("a", "k", "v").unwrap();
    store.remove("a", "k");
    store.save().unwrap();
    assert!(!path.exists());
}

#[test]
fn emptied_tree_deletes_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let store = open_store(&path);
    store.put("a/b", "k", "v").unwrap();
    store.save().unwrap();
    assert!(path.exists());

    store.remove_node("a").unwrap();
    store.save().unwrap();
    assert!(!path.exists());

    let reopened = open_store(&path);
    assert!(reopened.is_empty());
}

#[test]
fn removed_values_stay_removed_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    let store = open_store(&path);
    store.put("", "keep", "1").unwrap();
    store.put("", "drop", "2").unwrap();
    store.save().unwrap();
    store.remove("", "drop");
    store.save().unwrap();

    let reopened = open_store(&path);
    assert_eq!(reopened.keys(""), vec!["keep"]);
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("prefs.json");

    let store = PreferenceStore::open_with(&path, fast_options()).unwrap();
    store.put("", "k", "v").unwrap();
    store.save().unwrap();
    assert!(path.exists());
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![Just("a"), Just("b"), Just("c.d"), Just("e")].prop_map(str::to_string)
}

fn node_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 0..3).prop_map(|parts| parts.join("/"))
}

fn put_op() -> impl Strategy<Value = (String, String, String)> {
    (node_path(), segment(), "\\PC{0,12}")
}

fn assert_same_tree(store: &PreferenceStore, expected: &Node, node_path: &str) {
    let node = expected.lookup(node_path).unwrap();
    assert_eq!(store.keys(node_path), node.keys());
    assert_eq!(store.children_names(node_path), node.child_names());
    for key in node.keys() {
        assert_eq!(
            store.get(node_path, &key).as_deref(),
            node.value(&key),
            "value at {}/{}",
            node_path,
            key
        );
    }
    for child in node.child_names() {
        let child_path = if node_path.is_empty() {
            child
        } else {
            format!("{}/{}", node_path, child)
        };
        assert_same_tree(store, expected, &child_path);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn saved_tree_round_trips(ops in prop::collection::vec(put_op(), 1..24)) {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);

        let store = open_store(&path);
        for (node_path, key, value) in &ops {
            // Conflicting puts are rejected and leave the tree unchanged
            let _ = store.put(node_path, key, value);
        }
        let expected = store.snapshot();
        store.save().unwrap();

        let reopened = open_store(&path);
        prop_assert_eq!(reopened.snapshot(), expected.clone());
        assert_same_tree(&reopened, &expected, "");
        prop_assert!(backups(&path).is_empty());
    }
}
