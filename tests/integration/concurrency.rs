use crate::integration::support::{open_store, store_path, temp_files};
use prefstore::store::SaveLock;
use prefstore::{InterruptFlag, PreferenceStore, PrefsError, StoreOptions};
use std::fs;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn instances_exchange_changes_through_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let a = open_store(&path);
    let b = open_store(&path);

    a.put("", "foo", "1").unwrap();
    a.save().unwrap();
    b.reload().unwrap();
    assert_eq!(b.get("", "foo"), Some("1".to_string()));

    b.put("", "bar", "2").unwrap();
    b.save().unwrap();
    a.reload().unwrap();
    assert_eq!(a.get("", "foo"), Some("1".to_string()));
    assert_eq!(a.get("", "bar"), Some("2".to_string()));
}

#[test]
fn refresh_picks_up_other_instance_save() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let a = open_store(&path);
    let b = open_store(&path);

    a.put("", "k", "v").unwrap();
    a.save().unwrap();
    assert!(b.refresh().unwrap());
    assert_eq!(b.get("", "k"), Some("v".to_string()));
    assert!(!b.refresh().unwrap());
}

#[test]
fn reader_never_sees_partial_file() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let writer = open_store(&path);
    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));

    let reader = {
        let path = path.clone();
        let done = Arc::clone(&done);
        let reads = Arc::clone(&reads);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                match fs::read(&path) {
                    Ok(bytes) => {
                        let parsed: Result<serde_json::Value, _> = serde_json::from_slice(&bytes);
                        assert!(parsed.is_ok(), "reader saw a partial file");
                        reads.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => panic!("unexpected read error: {}", e),
                }
            }
        })
    };

    let payload = "x".repeat(4096);
    for i in 0..200 {
        writer
            .put(&format!("batch/{}", i % 7), &format!("key{}", i), &payload)
            .unwrap();
        writer.save().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    reader.join().unwrap();

    assert!(reads.load(Ordering::SeqCst) > 0);
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn concurrent_writers_leave_a_valid_file() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let options = StoreOptions {
        lock_timeout: Duration::from_secs(10),
        lock_retry_delay: Duration::from_millis(1),
    };

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let store = PreferenceStore::open_with(&path, options.clone()).unwrap();
            thread::spawn(move || {
                for i in 0..25 {
                    store
                        .put(&format!("writer{}", n), "round", &i.to_string())
                        .unwrap();
                    store.save().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = open_store(&path);
    assert_eq!(reopened.children_names("").len(), 1);
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn save_times_out_while_lock_is_held() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let store = open_store(&path);
    store.put("", "k", "v").unwrap();

    let held = SaveLock::acquire(
        store.lock_path(),
        Duration::from_secs(1),
        Duration::from_millis(5),
        &InterruptFlag::new(),
    )
    .unwrap();

    let err = store.save().unwrap_err();
    assert!(err.is_timeout());
    assert!(!path.exists());
    assert!(store.is_dirty());

    drop(held);
    store.save().unwrap();
    assert!(path.exists());
    assert!(!store.is_dirty());
}

#[test]
fn interrupted_save_stops_waiting() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let store = Arc::new(
        PreferenceStore::open_with(
            &path,
            StoreOptions {
                lock_timeout: Duration::from_secs(30),
                lock_retry_delay: Duration::from_millis(5),
            },
        )
        .unwrap(),
    );
    store.put("", "k", "v").unwrap();

    let _held = SaveLock::acquire(
        store.lock_path(),
        Duration::from_secs(1),
        Duration::from_millis(5),
        &InterruptFlag::new(),
    )
    .unwrap();

    let flag = store.interrupt_flag();
    let saver = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.save())
    };
    thread::sleep(Duration::from_millis(50));
    flag.interrupt();

    let result = saver.join().unwrap();
    assert!(matches!(result, Err(PrefsError::Interrupted { .. })));
    assert!(!path.exists());
}

#[test]
fn overlapping_saves_on_one_store_keep_latest_tree() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let store = Arc::new(
        PreferenceStore::open_with(
            &path,
            StoreOptions {
                lock_timeout: Duration::from_secs(10),
                lock_retry_delay: Duration::from_millis(5),
            },
        )
        .unwrap(),
    );
    store.put("", "v", "1").unwrap();

    let held = SaveLock::acquire(
        store.lock_path(),
        Duration::from_secs(1),
        Duration::from_millis(5),
        &InterruptFlag::new(),
    )
    .unwrap();

    let first = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.save())
    };
    thread::sleep(Duration::from_millis(50));
    store.put("", "v", "2").unwrap();
    let second = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.save())
    };
    thread::sleep(Duration::from_millis(50));
    drop(held);

    first.join().unwrap().unwrap();
    second.join().unwrap().unwrap();
    assert!(!store.is_dirty());

    let reopened = open_store(&path);
    assert_eq!(reopened.get("", "v"), Some("2".to_string()));
}

#[test]
fn failed_write_releases_lock_and_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    let store = open_store(&path);
    store.put("", "k", "v").unwrap();

    fs::create_dir(&path).unwrap();
    fs::write(path.join("occupied"), "x").unwrap();

    let err = store.save().unwrap_err();
    assert!(err.is_io());
    assert!(!err.is_timeout());
    assert!(temp_files(dir.path()).is_empty());
    assert!(store.is_dirty());

    let relock = SaveLock::acquire(
        store.lock_path(),
        Duration::ZERO,
        Duration::from_millis(1),
        &InterruptFlag::new(),
    );
    assert!(relock.is_ok());
}
