//! OS credential store backend.

use async_trait::async_trait;
use ::keyring::Entry;
use tracing::{debug, instrument};

use fieldkey_core::error::StoreError;
use fieldkey_core::{SessionStore, keys};

/// Default service name under which entries are filed.
pub const DEFAULT_SERVICE: &str = "fieldkey";

/// Keeps each session key in its own keychain / secret-service entry.
///
/// Platform calls block, so each one runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
}

impl KeyringSessionStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn run<T, F>(&self, key: &str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> keyring::Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key).map_err(backend)?;
            f(entry).map_err(backend)
        })
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("keyring task failed: {}", e),
        })?
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

fn backend(err: keyring::Error) -> StoreError {
    StoreError::Backend {
        message: err.to_string(),
    }
}

#[async_trait]
impl SessionStore for KeyringSessionStore {
    #[instrument(skip(self), fields(service = %self.service))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.run(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    #[instrument(skip(self, value), fields(service = %self.service))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.to_string();
        self.run(key, move |entry| entry.set_password(&value)).await
    }

    #[instrument(skip(self), fields(service = %self.service))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.run(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        for key in keys::ALL {
            self.remove(key).await?;
        }
        debug!(service = %self.service, "Keyring session entries removed");
        Ok(())
    }
}
