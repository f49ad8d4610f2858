//! Config store tests: identity, idempotence and conflict detection

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, Utc};
use common::{dataset, memory_backend, memory_stores, run_config, task};
use serde_json::json;
use trueno_runstore::configs::{ConfigKind, DataSplitConfig, RunConfig, TaskConfig};
use trueno_runstore::kv::{FileKvStore, KvStore, MemoryKvStore};
use trueno_runstore::store::ConfigStore;
use trueno_runstore::{Error, Result};

fn id_count(backend: &dyn KvStore, kind: ConfigKind) -> usize {
    backend
        .scan_prefix(&format!("configs/{kind}/ids/"))
        .unwrap()
        .len()
}

/// Backend whose first `failures` conditional writes report contention.
struct FlakyKvStore {
    inner: MemoryKvStore,
    failures: AtomicU32,
}

impl FlakyKvStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryKvStore::new(),
            failures: AtomicU32::new(failures),
        }
    }
}

impl KvStore for FlakyKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.set(key, value)
    }

    fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::WriteContention(key.to_string()));
        }
        self.inner.put_if_absent(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        self.inner.scan_prefix(prefix)
    }
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_store_twice_yields_one_record() {
    let (backend, stores) = memory_stores();
    let first = stores.configs.store(&task("t", 3)).unwrap();
    let second = stores.configs.store(&task("t", 3)).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
    assert_eq!(id_count(backend.as_ref(), ConfigKind::Task), 1);
}

#[test]
fn test_independently_built_configs_share_id() {
    let (_, stores) = memory_stores();
    let a = stores.configs.store_run_config(&run_config("run")).unwrap();
    let b = stores.configs.store_run_config(&run_config("run")).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        stores.configs.names::<TaskConfig>().unwrap(),
        vec!["dummy_task".to_string()]
    );
    assert_eq!(
        stores.configs.names::<DataSplitConfig>().unwrap(),
        vec!["dummy_split".to_string()]
    );
}

#[test]
fn test_same_content_other_kind_is_separate() {
    let (backend, stores) = memory_stores();
    stores.configs.store(&dataset("d")).unwrap();
    assert_eq!(id_count(backend.as_ref(), ConfigKind::Dataset), 1);
    assert_eq!(id_count(backend.as_ref(), ConfigKind::Task), 0);
}

// =============================================================================
// Conflicts
// =============================================================================

#[test]
fn test_forged_id_raises_content_conflict() {
    let (backend, stores) = memory_stores();
    let id = stores.configs.store(&task("t", 3)).unwrap();

    // Another writer put different content under the same id
    let key = format!("configs/tasks/ids/{id}");
    let mut doc: serde_json::Value = serde_json::from_slice(&backend.get(&key).unwrap().unwrap()).unwrap();
    doc["embedding_dims"] = json!(4);
    backend.set(&key, serde_json::to_vec(&doc).unwrap()).unwrap();

    match stores.configs.store(&task("t", 3)) {
        Err(Error::ContentConflict {
            kind,
            id: conflict_id,
            fields,
            existing,
            incoming,
        }) => {
            assert_eq!(kind, ConfigKind::Task);
            assert_eq!(conflict_id, id);
            assert_eq!(fields, vec!["embedding_dims".to_string()]);
            assert_eq!(existing["embedding_dims"], json!(4));
            assert_eq!(incoming["embedding_dims"], json!(3));
        }
        other => panic!("expected ContentConflict, got {other:?}"),
    }
    // never overwritten
    let stored: serde_json::Value = serde_json::from_slice(&backend.get(&key).unwrap().unwrap()).unwrap();
    assert_eq!(stored["embedding_dims"], json!(4));
}

#[test]
fn test_duplicate_name_is_rejected() {
    let (backend, stores) = memory_stores();
    let first = stores.configs.store(&task("t", 3)).unwrap();

    let err = stores.configs.store(&task("t", 4)).unwrap_err();
    match &err {
        Error::DuplicateName {
            kind,
            name,
            existing_id,
            incoming_id,
        } => {
            assert_eq!(*kind, ConfigKind::Task);
            assert_eq!(name, "t");
            assert_eq!(existing_id, &first);
            assert_ne!(incoming_id, &first);
        }
        other => panic!("expected DuplicateName, got {other:?}"),
    }
    assert!(!err.is_retryable());
    // the rejected record left nothing behind
    assert_eq!(id_count(backend.as_ref(), ConfigKind::Task), 1);
    let kept: TaskConfig = stores.configs.retrieve("t").unwrap();
    assert_eq!(kept, task("t", 3));
}

#[test]
fn test_empty_name_is_rejected() {
    let (_, stores) = memory_stores();
    assert!(matches!(
        stores.configs.store(&task("", 3)),
        Err(Error::InvalidInput(_))
    ));
}

// =============================================================================
// Bounded retry
// =============================================================================

#[test]
fn test_write_race_gives_up_after_five_attempts() {
    let store = ConfigStore::new(Arc::new(FlakyKvStore::new(100)));
    match store.store(&task("t", 3)) {
        Err(err @ Error::TransientWriteRace { attempts: 5, .. }) => assert!(err.is_retryable()),
        other => panic!("expected TransientWriteRace, got {other:?}"),
    }
}

#[test]
fn test_write_race_recovers_within_bound() {
    let backend = Arc::new(FlakyKvStore::new(4));
    let store = ConfigStore::new(backend);
    let id = store.store(&task("t", 3)).unwrap();
    assert_eq!(store.id_of(ConfigKind::Task, "t").unwrap(), Some(id));
}

#[test]
fn test_retry_bound_is_configurable() {
    let store = ConfigStore::new(Arc::new(FlakyKvStore::new(2))).with_max_upsert_attempts(2);
    assert!(matches!(
        store.store(&task("t", 3)),
        Err(Error::TransientWriteRace { attempts: 2, .. })
    ));
}

// =============================================================================
// Bookkeeping
// =============================================================================

#[test]
fn test_bookkeeping_is_filled_in_not_replaced() {
    let (_, stores) = memory_stores();
    let mut run = run_config("run");
    let id = stores.configs.store_run_config(&run).unwrap();

    let started: DateTime<Utc> = "2024-03-01T10:00:00Z".parse().unwrap();
    run.started = Some(started);
    assert_eq!(stores.configs.store(&run).unwrap(), id);
    let stored: RunConfig = stores.configs.retrieve("run").unwrap();
    assert_eq!(stored.started, Some(started));

    run.started = Some("2025-01-01T00:00:00Z".parse().unwrap());
    assert_eq!(stores.configs.store(&run).unwrap(), id);
    let stored: RunConfig = stores.configs.retrieve("run").unwrap();
    assert_eq!(stored.started, Some(started));
}

// =============================================================================
// Retrieval
// =============================================================================

#[test]
fn test_retrieve_by_name_and_id() {
    let (_, stores) = memory_stores();
    let run = run_config("run");
    let id = stores.configs.store_run_config(&run).unwrap();

    let by_name: RunConfig = stores.configs.retrieve("run").unwrap();
    let by_id: RunConfig = stores.configs.retrieve_by_id(&id).unwrap();
    assert_eq!(by_name, run);
    assert_eq!(by_id, run);

    let doc = stores.configs.retrieve_document(ConfigKind::Run, "run").unwrap();
    assert_eq!(doc["id"], json!(id));
    assert_eq!(doc["__type__"], json!("RunConfig"));
}

#[test]
fn test_retrieve_missing() {
    let (_, stores) = memory_stores();
    assert!(matches!(
        stores.configs.retrieve::<TaskConfig>("nope"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_unknown_type_tag_is_fatal() {
    let (backend, stores) = memory_stores();
    let doc = json!({"__type__": "HoloTaskConfig", "name": "future"});
    backend
        .set("configs/tasks/ids/abc", serde_json::to_vec(&doc).unwrap())
        .unwrap();
    backend
        .set("configs/tasks/names/future", b"abc".to_vec())
        .unwrap();

    match stores.configs.retrieve::<TaskConfig>("future") {
        Err(Error::UnresolvableTypeTag { family, tag }) => {
            assert_eq!(family, "TaskConfig");
            assert_eq!(tag, "HoloTaskConfig");
        }
        other => panic!("expected UnresolvableTypeTag, got {other:?}"),
    }
}

#[test]
fn test_list_names_sorted_and_escaped() {
    let (_, stores) = memory_stores();
    for name in ["zeta", "alpha", "group/beta"] {
        stores.configs.store(&task(name, 3)).unwrap();
    }
    assert_eq!(
        stores.configs.list_names(ConfigKind::Task).unwrap(),
        vec!["alpha", "group/beta", "zeta"]
    );
    assert!(stores.configs.list_names(ConfigKind::Run).unwrap().is_empty());
}

// =============================================================================
// Concurrent writers
// =============================================================================

#[test]
fn test_concurrent_identical_stores_agree() {
    let store = ConfigStore::new(memory_backend());
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.store(&task("shared", 3)).unwrap()
            })
        })
        .collect();
    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_concurrent_conflicting_stores_never_both_win() {
    let store = ConfigStore::new(memory_backend());
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [3, 4]
        .into_iter()
        .map(|dims| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.store(&task("contested", dims))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(Error::DuplicateName { .. }))));
}

#[test]
fn test_file_backend_idempotence_and_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn KvStore> = Arc::new(FileKvStore::open(dir.path()).unwrap());
    let store = ConfigStore::new(Arc::clone(&backend));

    let id = store.store_run_config(&run_config("run/1")).unwrap();
    // a second handle on the same directory sees the same record
    let reopened = ConfigStore::new(Arc::new(FileKvStore::open(dir.path()).unwrap()));
    assert_eq!(reopened.store_run_config(&run_config("run/1")).unwrap(), id);
    assert_eq!(reopened.retrieve::<RunConfig>("run/1").unwrap(), run_config("run/1"));
    assert!(matches!(
        reopened.store(&task("dummy_task", 99)),
        Err(Error::DuplicateName { .. })
    ));
    assert_eq!(id_count(backend.as_ref(), ConfigKind::Run), 1);
}
