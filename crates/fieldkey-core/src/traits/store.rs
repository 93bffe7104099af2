//! Durable key/value persistence for session facts.

use async_trait::async_trait;

use crate::error::StoreError;

/// Backing store for the persisted session.
///
/// Every operation may fail independently. Callers in this workspace never
/// let a failure escape: a broken store degrades to "not signed in".
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every key owned by this store.
    async fn clear(&self) -> Result<(), StoreError>;
}
