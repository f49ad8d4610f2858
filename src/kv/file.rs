//! Directory-backed KV store.
//!
//! One file per key under a root directory. Key segments map to directories,
//! with every byte outside `[A-Za-z0-9_-]` percent-encoded. Writes go to a
//! temp file first:
//! - `set` renames it over the target (atomic replace)
//! - `put_if_absent` hard-links it to the target, which fails if the target
//!   exists (atomic create)

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::KvStore;
use crate::{Error, Result};

const TMP_DIR: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// KV store keeping one file per key below a root directory.
///
/// Several processes may share the same root. Keys must not be a
/// segment-prefix of other keys (`a/b` and `a/b/c` cannot coexist).
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns error if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(TMP_DIR))?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() {
                return Err(Error::InvalidInput(format!("empty segment in key '{key}'")));
            }
            path.push(encode_segment(segment));
        }
        Ok(path)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments = relative
            .components()
            .map(|c| decode_segment(&c.as_os_str().to_string_lossy()))
            .collect::<Option<Vec<_>>>()?;
        Some(segments.join("/"))
    }

    fn write_temp(&self, value: &[u8]) -> Result<PathBuf> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.subsec_nanos());
        let name = format!(
            "{}-{}-{nanos}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let path = self.root.join(TMP_DIR).join(name);
        fs::write(&path, value)?;
        Ok(path)
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;
        let tmp = self.write_temp(&value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;
        let tmp = self.write_temp(&value)?;
        let linked = fs::hard_link(&tmp, &path);
        if let Err(err) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %err, "failed to remove temp file");
        }

        match linked {
            Ok(()) => Ok(None),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => match fs::read(&path) {
                Ok(existing) => Ok(Some(existing)),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(key, "key vanished between link and read");
                    Err(Error::WriteContention(key.to_string()))
                }
                Err(err) => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        // Walk from the deepest complete segment of the prefix.
        let dir = match prefix.rfind('/') {
            Some(idx) => self.path_for(&prefix[..idx])?,
            None => self.root.clone(),
        };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1) {
            let entry = entry.map_err(|e| Error::StorageError(format!("scan failed: {e}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(key) = self.key_for(entry.path()) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            match fs::read(entry.path()) {
                Ok(bytes) => entries.push((key, bytes)),
                // Deleted mid-scan
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// `None` for names the encoder never produces (temp dir, foreign files).
fn decode_segment(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = segment.get(i + 1..i + 3)?;
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' => {
                decoded.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(decoded).ok()
}
