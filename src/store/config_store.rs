//! Content-addressed config store.
//!
//! Records are keyed by the SHA-256 of their canonical JSON. Storing the same
//! content twice is a no-op; storing different content under an existing id
//! or an existing name is refused.
//!
//! ```text
//! configs/<kind>/ids/<content id>   -> document
//! configs/<kind>/names/<name>       -> content id
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::configs::{registry, ConfigKind, ConfigRecord, RunConfig};
use crate::kv::{key_segment, unescape_segment, KvStore};
use crate::serialize::canonical::strip_fields;
use crate::serialize::{content_id, differing_fields, unstructure, ID_FIELD};
use crate::{Error, Result};

/// Attempts made by the conditional write before giving up.
pub const DEFAULT_UPSERT_ATTEMPTS: u32 = 5;

/// Idempotent, append-only store for config records.
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn KvStore>,
    max_upsert_attempts: u32,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("max_upsert_attempts", &self.max_upsert_attempts)
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Create a store on top of a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend,
            max_upsert_attempts: DEFAULT_UPSERT_ATTEMPTS,
        }
    }

    /// Override the number of conditional-write attempts (at least one).
    #[must_use]
    pub fn with_max_upsert_attempts(mut self, attempts: u32) -> Self {
        self.max_upsert_attempts = attempts.max(1);
        self
    }

    /// Store a record and return its content id.
    ///
    /// Repeating the call with identical content returns the same id and
    /// writes nothing. Bookkeeping fields unset in the store but set on
    /// `record` are filled in.
    ///
    /// # Errors
    ///
    /// - [`Error::ContentConflict`] if the id already holds different content
    /// - [`Error::DuplicateName`] if the name belongs to a different record
    /// - [`Error::TransientWriteRace`] if the conditional write kept racing
    pub fn store<C: ConfigRecord>(&self, record: &C) -> Result<String> {
        let name = record.name();
        if name.is_empty() {
            return Err(Error::InvalidInput(format!("{} config without a name", C::KIND)));
        }

        let mut doc = unstructure(record)?;
        strip_fields(&mut doc, &[ID_FIELD]);
        let id = content_id(&doc, C::BOOKKEEPING)?;
        let id_key = id_key(C::KIND, &id);

        let inserted = match self.put_if_absent(&id_key, serde_json::to_vec(&doc)?)? {
            None => true,
            Some(existing) => {
                let existing: Value = serde_json::from_slice(&existing)?;
                self.check_same(C::KIND, &id, existing, &doc, C::BOOKKEEPING)?;
                false
            }
        };

        let name_key = name_key(C::KIND, name);
        if let Some(existing_id) = self.put_if_absent(&name_key, id.clone().into_bytes())? {
            let existing_id = String::from_utf8_lossy(&existing_id).into_owned();
            if existing_id != id {
                if inserted {
                    self.backend.delete(&id_key)?;
                }
                return Err(Error::DuplicateName {
                    kind: C::KIND,
                    name: name.to_string(),
                    existing_id,
                    incoming_id: id,
                });
            }
        }

        debug!(kind = %C::KIND, name, id = %id, inserted, "stored config");
        Ok(id)
    }

    /// Store a run config after the task, architecture, trainer and datasplit
    /// configs it embeds.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::store`] for the run or one of its parts.
    pub fn store_run_config(&self, run: &RunConfig) -> Result<String> {
        self.store(&run.task_config)?;
        self.store(&run.architecture_config)?;
        self.store(&run.trainer_config)?;
        self.store(&run.datasplit_config)?;
        self.store(run)
    }

    /// Retrieve a record by name.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no record has that name
    /// - [`Error::UnresolvableTypeTag`] if the stored type is unknown
    pub fn retrieve<C: ConfigRecord>(&self, name: &str) -> Result<C> {
        let doc = self.retrieve_document(C::KIND, name)?;
        registry().structure(doc)
    }

    /// Retrieve a record by content id.
    ///
    /// # Errors
    ///
    /// As [`Self::retrieve`].
    pub fn retrieve_by_id<C: ConfigRecord>(&self, id: &str) -> Result<C> {
        let doc = self.document_by_id(C::KIND, id)?;
        registry().structure(doc)
    }

    /// Retrieve the raw stored document by name, with its `id` field set.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no record has that name.
    pub fn retrieve_document(&self, kind: ConfigKind, name: &str) -> Result<Value> {
        let id = self.id_of(kind, name)?.ok_or_else(|| Error::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        })?;
        self.document_by_id(kind, &id)
    }

    /// Content id a name points to.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    pub fn id_of(&self, kind: ConfigKind, name: &str) -> Result<Option<String>> {
        Ok(self
            .backend
            .get(&name_key(kind, name))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// All names of a kind, sorted.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    pub fn list_names(&self, kind: ConfigKind) -> Result<Vec<String>> {
        let prefix = format!("configs/{kind}/names/");
        Ok(self
            .backend
            .scan_prefix(&prefix)?
            .into_iter()
            .map(|(key, _)| unescape_segment(&key[prefix.len()..]))
            .collect())
    }

    /// All names of the kind `C` is stored under.
    ///
    /// # Errors
    ///
    /// Backend read failures.
    pub fn names<C: ConfigRecord>(&self) -> Result<Vec<String>> {
        self.list_names(C::KIND)
    }

    fn document_by_id(&self, kind: ConfigKind, id: &str) -> Result<Value> {
        let bytes = self
            .backend
            .get(&id_key(kind, id))?
            .ok_or_else(|| Error::NotFound {
                kind: kind.to_string(),
                name: id.to_string(),
            })?;
        let mut doc: Value = serde_json::from_slice(&bytes)?;
        if let Value::Object(map) = &mut doc {
            map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        }
        Ok(doc)
    }

    fn put_if_absent(&self, key: &str, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        for attempt in 1..=self.max_upsert_attempts {
            match self.backend.put_if_absent(key, value.clone()) {
                Err(Error::WriteContention(_)) => {
                    debug!(key, attempt, "conditional write raced, retrying");
                }
                other => return other,
            }
        }
        Err(Error::TransientWriteRace {
            key: key.to_string(),
            attempts: self.max_upsert_attempts,
        })
    }

    fn check_same(
        &self,
        kind: ConfigKind,
        id: &str,
        existing: Value,
        incoming: &Value,
        bookkeeping: &[&str],
    ) -> Result<()> {
        let mut ignore = vec![ID_FIELD];
        ignore.extend_from_slice(bookkeeping);
        let fields = differing_fields(&existing, incoming, &ignore);
        if !fields.is_empty() {
            return Err(Error::ContentConflict {
                kind,
                id: id.to_string(),
                fields,
                existing: Box::new(existing),
                incoming: Box::new(incoming.clone()),
            });
        }
        if !bookkeeping.is_empty() {
            self.fill_bookkeeping(kind, id, existing, incoming, bookkeeping)?;
        }
        Ok(())
    }

    /// Copy bookkeeping values the store lacks. Values already stored win.
    fn fill_bookkeeping(
        &self,
        kind: ConfigKind,
        id: &str,
        mut existing: Value,
        incoming: &Value,
        bookkeeping: &[&str],
    ) -> Result<()> {
        let mut changed = false;
        for field in bookkeeping {
            let stored = existing.get(*field).cloned().unwrap_or(Value::Null);
            let given = incoming.get(*field).cloned().unwrap_or(Value::Null);
            match (stored.is_null(), given.is_null()) {
                (true, false) => {
                    if let Value::Object(map) = &mut existing {
                        map.insert((*field).to_string(), given);
                        changed = true;
                    }
                }
                (false, false) if stored != given => {
                    warn!(kind = %kind, id, field, "keeping stored bookkeeping value");
                }
                _ => {}
            }
        }
        if changed {
            info!(kind = %kind, id, "updating bookkeeping fields");
            self.backend
                .set(&id_key(kind, id), serde_json::to_vec(&existing)?)?;
        }
        Ok(())
    }
}

fn id_key(kind: ConfigKind, id: &str) -> String {
    format!("configs/{kind}/ids/{id}")
}

fn name_key(kind: ConfigKind, name: &str) -> String {
    format!("configs/{kind}/names/{}", key_segment(name))
}
