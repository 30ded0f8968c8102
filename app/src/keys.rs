//! Persistence of the secret bits into the host's saved-parameter files.
//!
//! The bits never travel with the protected asset. They are written into the
//! per-user parameter files the runtime restores on load, one file per owner
//! id under every local user profile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shroud_core::key::KeyVector;
use shroud_vfs::{AssetStore, VfsError};

/// Records holding a name longer than this were written by an obfuscating
/// tool and cannot be merged into.
pub const MAX_PARAM_NAME_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error(transparent)]
    Store(#[from] VfsError),
    #[error("malformed key record: {0}")]
    Format(#[from] serde_json::Error),
    #[error("invalid owner id '{0}'")]
    InvalidOwner(String),
    #[error("no user profiles under the saved parameters root")]
    NoProfiles,
    #[error("notification failed: {0}")]
    Notify(String),
}

/// One saved parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub name: String,
    pub value: f32,
}

/// A saved-parameter file. Entries other than key bits are kept as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(rename = "animationParameters", default)]
    pub entries: Vec<KeyEntry>,
}

impl KeyRecord {
    pub fn has_oversized_names(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.name.chars().count() > MAX_PARAM_NAME_LEN)
    }

    /// Write every bit of `key` under the matching name in `names`.
    ///
    /// Existing entries are updated in place and missing ones appended. A
    /// record with oversized names is cleared first.
    pub fn merge(&mut self, names: &[String], key: &KeyVector) {
        if self.has_oversized_names() {
            log::info!("Saved parameters hold obfuscated names, starting a fresh record");
            self.entries.clear();
        }
        for (name, &bit) in names.iter().zip(key.bits()) {
            let value = if bit { 1.0 } else { 0.0 };
            match self.entries.iter_mut().find(|entry| &entry.name == name) {
                Some(entry) => entry.value = value,
                None => self.entries.push(KeyEntry {
                    name: name.clone(),
                    value,
                }),
            }
        }
    }

    /// Every entry as a boolean, `1` meaning set.
    pub fn values(&self) -> BTreeMap<String, bool> {
        self.entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.value == 1.0))
            .collect()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Somewhere key records can be kept.
pub trait KeyStore {
    fn read(&self, owner: &str) -> Result<Option<KeyRecord>, KeyStoreError>;
    fn write(&self, owner: &str, record: &KeyRecord) -> Result<(), KeyStoreError>;
}

/// Key records in one user profile directory of an asset store.
pub struct LocalKeyStore<'a> {
    store: &'a dyn AssetStore,
    profile: String,
}

impl<'a> LocalKeyStore<'a> {
    pub fn new(store: &'a dyn AssetStore, profile: impl Into<String>) -> Self {
        Self {
            store,
            profile: profile.into(),
        }
    }

    /// One key store per profile directory at the root of `store`.
    pub fn discover(store: &'a dyn AssetStore) -> Result<Vec<Self>, KeyStoreError> {
        let mut profiles = Vec::new();
        for entry in store.list_dir("")? {
            if store.is_dir(&entry)? {
                profiles.push(Self::new(store, entry));
            }
        }
        if profiles.is_empty() {
            return Err(KeyStoreError::NoProfiles);
        }
        Ok(profiles)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn record_path(&self, owner: &str) -> Result<String, KeyStoreError> {
        if owner.trim().is_empty() || owner.contains(['/', '\\']) || owner == ".." {
            return Err(KeyStoreError::InvalidOwner(owner.to_owned()));
        }
        Ok(format!("{}/{owner}", self.profile))
    }
}

impl KeyStore for LocalKeyStore<'_> {
    fn read(&self, owner: &str) -> Result<Option<KeyRecord>, KeyStoreError> {
        let path = self.record_path(owner)?;
        if !self.store.exists(&path)? {
            return Ok(None);
        }
        let text = self.store.read_to_string(&path)?;
        Ok(Some(KeyRecord::from_json(&text)?))
    }

    fn write(&self, owner: &str, record: &KeyRecord) -> Result<(), KeyStoreError> {
        let path = self.record_path(owner)?;
        log::info!("Writing keys to {path}");
        self.store.write(&path, record.to_json()?.into_bytes())?;
        Ok(())
    }
}

/// Payload handed to a [`KeyNotifier`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyNotification {
    pub owner: String,
    pub values: BTreeMap<String, bool>,
}

/// Told about freshly written keys, for example a companion process that
/// applies them to a running client.
pub trait KeyNotifier {
    fn notify(&self, notification: &KeyNotification) -> Result<(), KeyStoreError>;
}

pub struct NoNotifier;

impl KeyNotifier for NoNotifier {
    fn notify(&self, _notification: &KeyNotification) -> Result<(), KeyStoreError> {
        Ok(())
    }
}

/// Merge `key` into the record for `owner` in every store.
///
/// Notification failures are logged and ignored. Returns the number of
/// records written.
pub fn persist_keys(
    stores: &[&dyn KeyStore],
    owner: &str,
    names: &[String],
    key: &KeyVector,
    notifier: &dyn KeyNotifier,
) -> Result<usize, KeyStoreError> {
    let mut written = 0;
    for store in stores {
        let mut record = store.read(owner)?.unwrap_or_default();
        record.merge(names, key);
        store.write(owner, &record)?;
        written += 1;

        let notification = KeyNotification {
            owner: owner.to_owned(),
            values: record.values(),
        };
        if let Err(e) = notifier.notify(&notification) {
            log::warn!("Key notification for {owner} failed: {e}");
        }
    }
    Ok(written)
}
