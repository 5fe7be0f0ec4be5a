use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::settings::{StorageConfig, StorageStrategy};
use crate::helpers::jwt;
use crate::store::storage::{CredentialStorage, FileStorage, MemoryStorage, StorageError};
use crate::utils::constants::{ACCESS_KEY, REFRESH_KEY};

/// Result of a credential read: the value, its absence, or a storage failure.
pub type Lookup = Result<Option<String>, StorageError>;

/// Where the refresh credential lives. The two variants never share a code path.
#[derive(Debug, Clone)]
pub enum RefreshPersistence {
    /// held by the server as an http-only cookie; the client never reads or writes it
    ServerCookie,
    /// written to client-readable durable storage
    Local(Arc<dyn CredentialStorage>),
}

/// Single source of truth for the access and refresh credentials.
pub struct TokenStore {
    access: Mutex<Option<String>>,
    session: Arc<dyn CredentialStorage>,
    refresh: RefreshPersistence,
}

impl TokenStore {
    pub fn new(session: Arc<dyn CredentialStorage>, refresh: RefreshPersistence) -> Self {
        Self {
            access: Mutex::new(None),
            session,
            refresh,
        }
    }

    /// Memory-only session storage with cookie-managed refresh.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), RefreshPersistence::ServerCookie)
    }

    pub fn from_config(cfg: &StorageConfig) -> Self {
        let session: Arc<dyn CredentialStorage> = match &cfg.session_path {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        let refresh = match (cfg.strategy, &cfg.refresh_path) {
            (StorageStrategy::LocalPersistent, Some(path)) => {
                RefreshPersistence::Local(Arc::new(FileStorage::new(path)))
            }
            (StorageStrategy::LocalPersistent, None) => {
                warn!("local_persistent strategy without refresh_path, keeping refresh credential in memory");
                RefreshPersistence::Local(Arc::new(MemoryStorage::new()))
            }
            (StorageStrategy::CookiePreferred, _) => RefreshPersistence::ServerCookie,
        };
        Self::new(session, refresh)
    }

    pub fn strategy(&self) -> StorageStrategy {
        match self.refresh {
            RefreshPersistence::ServerCookie => StorageStrategy::CookiePreferred,
            RefreshPersistence::Local(_) => StorageStrategy::LocalPersistent,
        }
    }

    pub fn set_access(&self, token: &str) {
        debug!(expires_at = ?jwt::expires_at(token), "access credential set");
        *self.lock_access() = Some(token.to_owned());
        if let Err(e) = self.session.store(ACCESS_KEY, token) {
            warn!("access credential kept in memory only: {}", e);
        }
    }

    /// In-memory value first, then the session storage (survives a restart of the
    /// same session).
    pub fn get_access(&self) -> Lookup {
        let mut access = self.lock_access();
        if let Some(token) = access.as_ref() {
            return Ok(Some(token.to_owned()));
        }
        let hydrated = self.session.load(ACCESS_KEY)?;
        if hydrated.is_some() {
            debug!("access credential hydrated from session storage");
        }
        *access = hydrated.clone();
        Ok(hydrated)
    }

    pub fn clear_access(&self) {
        *self.lock_access() = None;
        if let Err(e) = self.session.remove(ACCESS_KEY) {
            warn!("persisted access credential not removed: {}", e);
        }
    }

    pub fn set_refresh(&self, token: &str) {
        match &self.refresh {
            RefreshPersistence::ServerCookie => {
                debug!("refresh credential is cookie-managed, not stored client-side");
            }
            RefreshPersistence::Local(storage) => {
                if let Err(e) = storage.store(REFRESH_KEY, token) {
                    warn!("refresh credential not persisted: {}", e);
                }
            }
        }
    }

    pub fn get_refresh(&self) -> Lookup {
        match &self.refresh {
            RefreshPersistence::ServerCookie => Ok(None),
            RefreshPersistence::Local(storage) => storage.load(REFRESH_KEY),
        }
    }

    pub fn clear_refresh(&self) {
        if let RefreshPersistence::Local(storage) = &self.refresh {
            if let Err(e) = storage.remove(REFRESH_KEY) {
                warn!("persisted refresh credential not removed: {}", e);
            }
        }
    }

    pub fn clear_all(&self) {
        self.clear_access();
        self.clear_refresh();
    }

    // a poisoned lock only means a panic elsewhere; the Option inside is still usable
    fn lock_access(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.access.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// credential values stay out of debug output
impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access", &self.lock_access().is_some())
            .field("session", &self.session)
            .field("strategy", &self.strategy())
            .finish()
    }
}
