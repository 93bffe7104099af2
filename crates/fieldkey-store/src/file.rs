//! JSON-file session store.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, instrument};

use fieldkey_core::SessionStore;
use fieldkey_core::error::StoreError;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

type Entries = BTreeMap<String, String>;

/// Persists session entries as one JSON object on disk.
///
/// Writes go to a temporary file that is renamed over the original, under an
/// exclusive lock on a sibling `.lock` file, so concurrent processes never
/// see a half-written session. On Unix the file is readable by its owner only.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: Arc<PathBuf>,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Arc::new(path.as_ref().to_path_buf()),
        }
    }

    /// Returns the path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the current entries while holding the lock, writing
    /// them back if it returns `true`.
    async fn with_entries<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Entries) -> (T, bool) + Send + 'static,
    {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || {
            let lock = lock_file(&path)?;
            lock.lock_exclusive()?;

            let result: Result<T, StoreError> = (|| {
                let mut entries = read_entries(&path)?;
                let (value, dirty) = f(&mut entries);
                if dirty {
                    write_entries(&path, &entries)?;
                }
                Ok(value)
            })();

            lock.unlock()?;
            result
        })
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("session file task failed: {}", e),
        })?
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn lock_file(path: &Path) -> Result<fs::File, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path(path))?)
}

fn read_entries(path: &Path) -> Result<Entries, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), StoreError> {
    if entries.is_empty() {
        return match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    }

    let json = serde_json::to_string_pretty(entries)?;
    let temp_path = path.with_extension("tmp");
    let mut temp = create_private(&temp_path)?;
    temp.write_all(json.as_bytes())?;
    temp.sync_all()?;
    drop(temp);

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), keys = entries.len(), "Session file written");
    Ok(())
}

/// Create (or truncate) `path` so that it is owner-only from the start.
fn create_private(path: &Path) -> Result<fs::File, StoreError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let file = options.open(path)?;

    // A leftover temp file keeps its old mode; `mode` only applies on creation.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;

    Ok(file)
}

#[async_trait]
impl SessionStore for FileSessionStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_entries(move |entries| (entries.get(&key).cloned(), false))
            .await
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_entries(move |entries| {
            let changed = entries.get(&key) != Some(&value);
            entries.insert(key, value);
            ((), changed)
        })
        .await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_entries(move |entries| ((), entries.remove(&key).is_some()))
            .await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn clear(&self) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            let dirty = !entries.is_empty();
            entries.clear();
            ((), dirty)
        })
        .await
    }
}
