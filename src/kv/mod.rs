//! Key-Value Store Module
//!
//! The shared backing store every run process talks to. Keys are
//! `/`-separated paths, values are JSON documents as bytes:
//! - In-memory backend ([`MemoryKvStore`]) for tests and single-process use
//! - Directory backend ([`FileKvStore`]) shared by processes on one filesystem
//!
//! All calls are synchronous. The only atomic primitive the stores rely on is
//! [`KvStore::put_if_absent`], a conditional write on absence.
//!
//! # Example
//!
//! ```rust
//! use trueno_runstore::kv::{KvStore, MemoryKvStore};
//!
//! # fn example() -> trueno_runstore::Result<()> {
//! let store = MemoryKvStore::new();
//!
//! store.set("runs/a", b"1".to_vec())?;
//! assert_eq!(store.put_if_absent("runs/a", b"2".to_vec())?, Some(b"1".to_vec()));
//! assert_eq!(store.put_if_absent("runs/b", b"2".to_vec())?, None);
//!
//! let keys: Vec<String> = store.scan_prefix("runs/")?.into_iter().map(|(k, _)| k).collect();
//! assert_eq!(keys, vec!["runs/a", "runs/b"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod file;
mod memory;

pub use file::FileKvStore;
pub use memory::MemoryKvStore;

use crate::Result;

/// Synchronous key-value store shared between run processes.
pub trait KvStore: Send + Sync {
    /// Get a value by key.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value for a key.
    ///
    /// Overwrites any existing value.
    ///
    /// # Errors
    ///
    /// Backend write failures.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Atomically insert a value if the key is absent.
    ///
    /// Returns `None` if the value was inserted, or the value already stored.
    ///
    /// # Errors
    ///
    /// Backend failures, or [`Error::WriteContention`](crate::Error::WriteContention)
    /// if the key changed under the call (the caller may retry).
    fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>>;

    /// Delete a key.
    ///
    /// No-op if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Backend write failures.
    fn delete(&self, key: &str) -> Result<()>;

    /// All entries whose key starts with `prefix`, sorted by key.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Delete every key starting with `prefix`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Backend failures. Keys deleted before the failure stay deleted.
    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let entries = self.scan_prefix(prefix)?;
        for (key, _) in &entries {
            self.delete(key)?;
        }
        Ok(entries.len())
    }

    /// Get multiple keys in a batch.
    ///
    /// Returns values in the same order as keys. Missing keys return `None`.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    fn batch_get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Set multiple key-value pairs in a batch.
    ///
    /// # Errors
    ///
    /// Backend write failures. Pairs written before the failure stay written.
    fn batch_set(&self, pairs: Vec<(&str, Vec<u8>)>) -> Result<()> {
        for (key, value) in pairs {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Escape a user-supplied name so it occupies exactly one key segment.
#[must_use]
pub fn key_segment(name: &str) -> String {
    name.replace('%', "%25").replace('/', "%2F")
}

/// Inverse of [`key_segment`].
#[must_use]
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("%2F", "/").replace("%25", "%")
}
