use crate::integration::support::fast_options;
use prefstore::PreferenceRegistry;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn files_are_independent() {
    let dir = TempDir::new().unwrap();
    let registry = PreferenceRegistry::new(dir.path(), fast_options());

    registry.file("editor").unwrap().put("font", "mono").unwrap();
    registry.user_root().unwrap().put("name", "dev").unwrap();
    registry.file("editor").unwrap().flush().unwrap();
    registry.user_root().unwrap().flush().unwrap();

    assert!(dir.path().join("editor.json").exists());
    assert!(dir.path().join("user.json").exists());

    let fresh = PreferenceRegistry::new(dir.path(), fast_options());
    assert_eq!(fresh.file("editor").unwrap().get_opt("name"), None);
    assert_eq!(fresh.user_root().unwrap().get("name", ""), "dev");
}

#[test]
fn threads_share_one_store_per_name() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(PreferenceRegistry::new(dir.path(), fast_options()));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let node = registry.file("shared").unwrap();
                node.node(&format!("t{}", n))
                    .unwrap()
                    .put("id", &n.to_string())
                    .unwrap();
                Arc::clone(node.store())
            })
        })
        .collect();
    let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for store in &stores[1..] {
        assert!(Arc::ptr_eq(&stores[0], store));
    }
    assert_eq!(stores[0].children_names("").len(), 8);
}
