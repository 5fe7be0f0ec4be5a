use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage content at '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous key/value back-end for credentials.
///
/// Reads and writes never suspend; callers decide whether a failure matters.
pub trait CredentialStorage: Send + Sync + Debug {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-lifetime storage, the counterpart of a tab-scoped session store.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.lock().map(|map| map.len()).unwrap_or_default();
        f.debug_struct("MemoryStorage").field("keys", &keys).finish()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".to_owned()))
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON file holding a flat `{key: value}` map.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the target,
/// with 0600 permissions on unix.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(StorageError::Io { path: self.path.clone(), source });
            }
        };
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_vec_pretty(map).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}

/// Back-end that refuses every operation, e.g. storage turned off by the user.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStorage;

impl CredentialStorage for DisabledStorage {
    fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_owned()))
    }

    fn store(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_owned()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_owned()))
    }
}
