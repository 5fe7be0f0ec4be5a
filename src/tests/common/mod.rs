// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::config::settings::{ApiConfig, NavigationConfig};
use crate::session::{AuthSession, BrowsingContext, ToastKind};
use crate::store::{MemoryStorage, RefreshPersistence, TokenStore};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Browsing context that remembers every toast and navigation.
#[derive(Debug, Default)]
pub struct RecordingBrowsingContext {
    pub toasts: Mutex<Vec<(ToastKind, String)>>,
    pub redirects: Mutex<Vec<String>>,
}

impl RecordingBrowsingContext {
    pub fn toasts(&self) -> Vec<(ToastKind, String)> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl BrowsingContext for RecordingBrowsingContext {
    fn toast(&self, kind: ToastKind, message: &str) {
        self.toasts.lock().unwrap().push((kind, message.to_owned()));
    }

    fn redirect(&self, location: &str) {
        self.redirects.lock().unwrap().push(location.to_owned());
    }
}

/// Cookie-mode session with in-memory session storage.
pub fn cookie_session(base_url: &str) -> (AuthSession, Arc<RecordingBrowsingContext>) {
    session_with(base_url, TokenStore::in_memory())
}

/// Local-persistent session; both storages in memory.
pub fn local_session(base_url: &str) -> (AuthSession, Arc<RecordingBrowsingContext>) {
    let tokens = TokenStore::new(
        Arc::new(MemoryStorage::new()),
        RefreshPersistence::Local(Arc::new(MemoryStorage::new())),
    );
    session_with(base_url, tokens)
}

pub fn session_with(base_url: &str, tokens: TokenStore) -> (AuthSession, Arc<RecordingBrowsingContext>) {
    session_with_api(&ApiConfig::new(base_url), tokens)
}

pub fn session_with_api(api: &ApiConfig, tokens: TokenStore) -> (AuthSession, Arc<RecordingBrowsingContext>) {
    let browsing = Arc::new(RecordingBrowsingContext::default());
    let session = AuthSession::new(
        api,
        NavigationConfig::default(),
        tokens,
        browsing.clone(),
    )
    .expect("session");
    (session, browsing)
}
