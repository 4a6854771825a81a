//! Durable holders for the current credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::debug;

use crate::{error::StoreError, models::Credential};

/// A key-value store the orchestrator persists credentials into.
///
/// Implementations must keep values for at least the lifetime of one session.
pub trait CredentialStore: Send + Sync {
    /// Get the credential stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Credential>, StoreError>;

    /// Store `credential` under `key`, replacing any previous value.
    fn set(&self, key: &str, credential: Credential) -> Result<(), StoreError>;
}

/// A store that lives as long as the process.
#[derive(Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, credential: Credential) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), credential);
        Ok(())
    }
}

/// A store backed by a JSON file, surviving process restarts.
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    value: Credential,
    stored_at: DateTime<Utc>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredCredential>, StoreError> {
        match fs::read(&self.path) {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.load()?.remove(key).map(|stored| stored.value))
    }

    fn set(&self, key: &str, credential: Credential) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), StoredCredential { value: credential, stored_at: Utc::now() });

        // Write next to the target and rename so readers never observe a partial file.
        let contents = serde_json::to_vec_pretty(&entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Stored credential under key={key} in {}", self.path.display());
        Ok(())
    }
}
