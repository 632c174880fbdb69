#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reposearch_core::api::GitHubClient;
use reposearch_core::auth::{
    CredentialStore, HandshakeRelay, MemoryCredentialStore, Session, SessionManager, StoreError,
    SurfaceHost, SurfaceId,
};
use tokio::sync::mpsc;

/// Surface host that reports each opened surface to the test.
pub struct ScriptedHost {
    opened: mpsc::UnboundedSender<SurfaceId>,
    pub closed: Mutex<Vec<SurfaceId>>,
}

impl ScriptedHost {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SurfaceId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                opened: tx,
                closed: Mutex::new(Vec::new()),
            }),
            rx,
        )
    }

    pub fn closed(&self) -> Vec<SurfaceId> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SurfaceHost for ScriptedHost {
    async fn open(&self, id: SurfaceId, _url: &str) -> anyhow::Result<()> {
        let _ = self.opened.send(id);
        Ok(())
    }

    async fn close(&self, id: SurfaceId) -> anyhow::Result<()> {
        self.closed.lock().unwrap().push(id);
        Ok(())
    }
}

/// Store whose every operation fails, standing in for an unreadable disk.
pub struct FailingStore;

#[async_trait]
impl CredentialStore for FailingStore {
    async fn load(&self) -> Result<Option<Session>, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "storage locked",
        )))
    }

    async fn save(&self, _session: &Session) -> Result<(), StoreError> {
        Err(StoreError::Task("storage locked".to_string()))
    }

    async fn remove(&self) -> Result<(), StoreError> {
        Err(StoreError::Task("storage locked".to_string()))
    }
}

pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub host: Arc<ScriptedHost>,
    pub opened: mpsc::UnboundedReceiver<SurfaceId>,
    pub client: GitHubClient,
    pub session: Arc<SessionManager>,
}

pub fn harness(base_url: &str, timeout: Duration) -> Harness {
    let store = Arc::new(MemoryCredentialStore::new());
    let (host, opened) = ScriptedHost::new();
    let client = GitHubClient::with_base_url(base_url).unwrap();
    let relay = HandshakeRelay::new(host.clone()).with_timeout(timeout);
    let session = Arc::new(SessionManager::new(store.clone(), relay, client.clone()));
    Harness {
        store,
        host,
        opened,
        client,
        session,
    }
}

/// A search response body holding one repository.
pub fn one_repo_body() -> serde_json::Value {
    serde_json::json!({
        "total_count": 1,
        "incomplete_results": false,
        "items": [{
            "id": 1,
            "name": "r",
            "full_name": "u/r",
            "description": null,
            "stargazers_count": 5,
            "language": null,
            "html_url": "https://x",
            "owner": {"login": "u", "avatar_url": "https://a"}
        }]
    })
}
