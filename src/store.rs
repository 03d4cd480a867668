use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Digest, JobStatus, PreferenceError, Preferences, StatusHistoryItem};

pub const KEY_SAVED_JOB_IDS: &str = "saved-job-ids";
pub const KEY_PREFERENCES: &str = "preferences";
pub const KEY_STATUS_MAP: &str = "job-status-map";
pub const KEY_STATUS_HISTORY: &str = "job-status-history";
pub const KEY_DIGESTS: &str = "digest-by-date";

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Synchronous string-keyed storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Writes several keys together. Backends that support transactions
    /// should override this so either all entries land or none do.
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A typed record living under a fixed key.
pub trait Record: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;

    /// Decoded values failing this check are treated as malformed.
    fn is_valid(&self) -> bool {
        true
    }
}

impl Record for Preferences {
    const KEY: &'static str = KEY_PREFERENCES;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SavedJobIds(pub Vec<String>);

impl Record for SavedJobIds {
    const KEY: &'static str = KEY_SAVED_JOB_IDS;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StatusMap(pub BTreeMap<String, JobStatus>);

impl StatusMap {
    pub fn get(&self, job_id: &str) -> JobStatus {
        self.0.get(job_id).copied().unwrap_or_default()
    }
}

impl Record for StatusMap {
    const KEY: &'static str = KEY_STATUS_MAP;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StatusHistory(pub Vec<StatusHistoryItem>);

impl Record for StatusHistory {
    const KEY: &'static str = KEY_STATUS_HISTORY;

    fn is_valid(&self) -> bool {
        self.0.len() <= HISTORY_LIMIT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DigestArchive(pub BTreeMap<String, Digest>);

impl Record for DigestArchive {
    const KEY: &'static str = KEY_DIGESTS;

    fn is_valid(&self) -> bool {
        self.0.iter().all(|(key, digest)| *key == digest.date_key())
    }
}

/// Typed access over a backend, with an in-memory session copy.
///
/// Every successful read and every write is mirrored into `session`. When the
/// backend fails, it is dropped for the rest of the session and all further
/// traffic goes to `session` only; `notice()` then reports why.
pub struct Storage {
    backend: Option<Box<dyn KeyValueStore>>,
    session: MemoryStore,
    notice: Option<String>,
}

impl Storage {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
            session: MemoryStore::new(),
            notice: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Session-only storage, used when the backend could not be opened at all.
    pub fn degraded(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "storage unavailable, changes will not persist");
        Self {
            backend: None,
            session: MemoryStore::new(),
            notice: Some(format!(
                "Storage unavailable ({}); changes will only last for this session.",
                reason
            )),
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.backend.is_none()
    }

    fn degrade(&mut self, err: StoreError) {
        warn!(error = %err, "storage failed, falling back to session memory");
        self.backend = None;
        self.notice = Some(format!(
            "Storage unavailable ({}); changes will only last for this session.",
            err
        ));
    }

    fn read_raw(&mut self, key: &str) -> Option<String> {
        if let Ok(Some(value)) = self.session.get(key) {
            return Some(value);
        }
        let result = match self.backend.as_ref() {
            Some(backend) => backend.get(key),
            None => return None,
        };
        match result {
            Ok(Some(value)) => {
                let _ = self.session.set(key, &value);
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                self.degrade(e);
                None
            }
        }
    }

    fn write_raw(&mut self, entries: &[(&str, String)]) {
        for (key, value) in entries {
            let _ = self.session.set(key, value);
        }
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.set_many(entries) {
                self.degrade(e);
            }
        }
    }

    /// Reads a record; absent, undecodable or invalid values yield the default.
    pub fn load<R: Record>(&mut self) -> R {
        let Some(raw) = self.read_raw(R::KEY) else {
            return R::default();
        };
        match serde_json::from_str::<R>(&raw) {
            Ok(record) if record.is_valid() => record,
            Ok(_) => {
                warn!(key = R::KEY, "stored record failed validation, using defaults");
                R::default()
            }
            Err(e) => {
                warn!(key = R::KEY, error = %e, "malformed stored record, using defaults");
                R::default()
            }
        }
    }

    pub(crate) fn save<R: Record>(&mut self, record: &R) {
        if let Some(entry) = encode(record) {
            self.write_raw(&[entry]);
        }
    }

    /// Writes two records in a single batch; nothing is written if either fails to encode.
    pub(crate) fn save_pair<A: Record, B: Record>(&mut self, first: &A, second: &B) {
        let (Some(a), Some(b)) = (encode(first), encode(second)) else {
            return;
        };
        debug!(first = A::KEY, second = B::KEY, "saving paired records");
        self.write_raw(&[a, b]);
    }

    pub fn remove(&mut self, key: &str) {
        let _ = self.session.remove(key);
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.remove(key) {
                self.degrade(e);
            }
        }
    }

    pub fn preferences(&mut self) -> Preferences {
        self.load()
    }

    /// Normalizes and validates before persisting; invalid preferences are never written.
    pub fn save_preferences(&mut self, prefs: Preferences) -> Result<Preferences, PreferenceError> {
        let prefs = prefs.normalized();
        prefs.validate()?;
        self.save(&prefs);
        Ok(prefs)
    }

    pub fn reset_preferences(&mut self) {
        self.remove(KEY_PREFERENCES);
    }
}

fn encode<R: Record>(record: &R) -> Option<(&'static str, String)> {
    match serde_json::to_string(record) {
        Ok(value) => Some((R::KEY, value)),
        Err(e) => {
            warn!(key = R::KEY, error = %e, "failed to encode record, not saved");
            None
        }
    }
}
