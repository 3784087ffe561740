//! `KeyValueStore` trait: the host-supplied get/set primitives.

use async_trait::async_trait;

use crate::error::StoreError;

/// Backend-agnostic string key-value store.
///
/// Values are opaque strings; callers store JSON documents in them.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Returns whether an entry existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}
