//! `ProfileRepository`: owned data-access layer for the profile.
//!
//! Holds the in-memory profile, hands out owned snapshots, and writes every
//! merge through to the key-value store before accepting the next one.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::merge::shallow_merge;
use super::model::{Profile, Task};
use crate::error::{StoreError, UpdateError};
use crate::store::KeyValueStore;

/// Outcome of reading the stored profile.
enum Stored {
    Found(Profile),
    Missing,
    Unreadable,
}

pub struct ProfileRepository {
    store: Arc<dyn KeyValueStore>,
    key: String,
    /// Held across merge and persist so writes never interleave.
    current: Mutex<Profile>,
}

impl ProfileRepository {
    /// Load the profile stored under `key`, creating it on first run.
    ///
    /// - No entry: the default profile is written and held.
    /// - Entry present but unreadable: the default is held in memory only,
    ///   leaving the stored document untouched.
    /// - Otherwise the stored profile is held as-is.
    pub async fn open(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let profile = match read(store.as_ref(), &key).await {
            Stored::Found(profile) => {
                debug!(key = %key, "Loaded stored profile");
                profile
            }
            Stored::Missing => {
                let profile = Profile::default();
                match write(store.as_ref(), &key, &profile).await {
                    Ok(()) => info!(key = %key, "Created default profile"),
                    Err(e) => warn!(key = %key, error = %e, "Failed to persist default profile"),
                }
                profile
            }
            Stored::Unreadable => Profile::default(),
        };

        Self {
            store,
            key,
            current: Mutex::new(profile),
        }
    }

    /// The store key this repository reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored profile. Any read or parse failure yields `None`.
    pub async fn load(&self) -> Option<Profile> {
        match read(self.store.as_ref(), &self.key).await {
            Stored::Found(profile) => Some(profile),
            Stored::Missing | Stored::Unreadable => None,
        }
    }

    /// Write `profile` to the store. Does not touch the in-memory copy.
    pub async fn save(&self, profile: &Profile) -> Result<(), StoreError> {
        write(self.store.as_ref(), &self.key, profile).await
    }

    /// An owned copy of the current profile.
    pub async fn snapshot(&self) -> Profile {
        self.current.lock().await.clone()
    }

    /// Shallow-merge `data` into the profile and persist the result.
    ///
    /// The merged profile replaces the in-memory copy even if the write
    /// fails; the failure is logged and the change stays unsynced.
    pub async fn apply_update(&self, data: &Map<String, Value>) -> Result<Profile, UpdateError> {
        let mut current = self.current.lock().await;
        let merged = shallow_merge(&current, data)?;
        *current = merged.clone();

        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        match write(self.store.as_ref(), &self.key, &merged).await {
            Ok(()) => info!(keys = ?keys, "Profile updated"),
            Err(e) => warn!(keys = ?keys, error = %e, "Profile updated in memory but not persisted"),
        }

        Ok(merged)
    }

    /// Append a pending task (a reminder) and persist the result.
    pub async fn add_task(&self, text: &str) -> Profile {
        let mut current = self.current.lock().await;
        current.lists.tasks.push(Task::new(text.trim()));
        let profile = current.clone();

        match write(self.store.as_ref(), &self.key, &profile).await {
            Ok(()) => info!(tasks = profile.lists.tasks.len(), "Task added"),
            Err(e) => warn!(error = %e, "Task added in memory but not persisted"),
        }
        profile
    }
}

async fn read(store: &dyn KeyValueStore, key: &str) -> Stored {
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str::<Profile>(&raw) {
            Ok(profile) => Stored::Found(profile),
            Err(e) => {
                warn!(key = %key, error = %e, "Stored profile could not be parsed");
                Stored::Unreadable
            }
        },
        Ok(None) => Stored::Missing,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read stored profile");
            Stored::Unreadable
        }
    }
}

async fn write(store: &dyn KeyValueStore, key: &str, profile: &Profile) -> Result<(), StoreError> {
    let raw = serde_json::to_string(profile).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.set(key, &raw).await
}
