//! Token handshake between the long-lived core and a transient surface.
//!
//! Each handshake moves through `Spawning -> Waiting -> Resolved -> Closed`.
//! The relay allocates a surface id and registers a [`PendingHandshake`]
//! before asking the [`SurfaceHost`] to open anything, so a delivery can
//! never arrive for an unregistered surface. Resolution is single-assignment:
//! whichever of delivery, abandonment or the deadline resolves the pending
//! slot first wins, and the others find nothing to resolve.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::ApiError;

/// Where the user creates a token for the handshake.
pub const AUTH_ENTRY_URL: &str =
    "https://github.com/settings/tokens/new?description=reposearch&scopes=repo";

/// How long a handshake waits for a token before giving up.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Identifier of a spawned surface (a browser tab, a terminal prompt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Origin of a runtime message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageSender {
    pub surface: Option<SurfaceId>,
}

impl MessageSender {
    /// A caller that is not a spawned surface (popup, CLI, stdio client).
    pub fn external() -> Self {
        Self::default()
    }

    pub fn surface(id: SurfaceId) -> Self {
        Self { surface: Some(id) }
    }
}

/// Opens and closes the transient surfaces that collect tokens.
#[async_trait]
pub trait SurfaceHost: Send + Sync {
    async fn open(&self, id: SurfaceId, url: &str) -> anyhow::Result<()>;

    async fn close(&self, id: SurfaceId) -> anyhow::Result<()>;
}

/// A handshake in the `Waiting` state.
#[derive(Debug)]
pub struct PendingHandshake {
    pub surface: SurfaceId,
    slot: oneshot::Sender<Option<String>>,
}

type PendingMap = HashMap<SurfaceId, PendingHandshake>;

/// Clone is cheap; clones share the pending map.
#[derive(Clone)]
pub struct HandshakeRelay {
    host: Arc<dyn SurfaceHost>,
    pending: Arc<Mutex<PendingMap>>,
    next_id: Arc<AtomicU64>,
    timeout: Duration,
}

impl HandshakeRelay {
    pub fn new(host: Arc<dyn SurfaceHost>) -> Self {
        Self {
            host,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of handshakes still waiting for a token.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PendingMap> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take(&self, surface: SurfaceId) -> Option<PendingHandshake> {
        self.lock().remove(&surface)
    }

    /// Open a surface and wait for it to deliver a token.
    ///
    /// Returns `Ok(None)` when the user closes the surface or the deadline
    /// passes. On timeout the surface is left open.
    pub async fn acquire_token(&self) -> Result<Option<String>, ApiError> {
        let surface = SurfaceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let deadline = Instant::now() + self.timeout;
        let (slot, result) = oneshot::channel();

        let already_pending = {
            let mut pending = self.lock();
            let count = pending.len();
            pending.insert(surface, PendingHandshake { surface, slot });
            count
        };
        if already_pending > 0 {
            // Concurrent handshakes are not merged; each gets its own surface.
            info!(%surface, already_pending, "Starting handshake while others are pending");
        }

        // Deregisters on every exit path, including cancellation of this future.
        let _registration = Registration {
            relay: self,
            surface,
        };

        if let Err(e) = self.host.open(surface, AUTH_ENTRY_URL).await {
            return Err(ApiError::Authentication(format!(
                "Could not open authentication surface: {:#}",
                e
            )));
        }
        debug!(%surface, url = AUTH_ENTRY_URL, "Waiting for token");

        match tokio::time::timeout_at(deadline, result).await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(_)) => Ok(None),
            Err(_) => {
                warn!(%surface, timeout_secs = self.timeout.as_secs(), "Handshake timed out; surface left open");
                Ok(None)
            }
        }
    }

    /// Handle a token-delivery message.
    ///
    /// Only resolves the handshake whose surface sent the message; returns
    /// whether one was resolved.
    pub async fn deliver(&self, sender: &MessageSender, token: String) -> bool {
        let Some(surface) = sender.surface else {
            debug!("Ignoring token from a sender without a surface");
            return false;
        };
        let Some(pending) = self.take(surface) else {
            debug!(%surface, "Ignoring token for a surface with no pending handshake");
            return false;
        };

        // Resolve before closing so a slow close cannot push past the deadline.
        let resolved = pending.slot.send(Some(token)).is_ok();
        if !resolved {
            debug!(%surface, "Waiter gone before the token arrived");
        }

        if let Err(e) = self.host.close(surface).await {
            warn!(%surface, error = %e, "Failed to close authentication surface");
        }
        resolved
    }

    /// The user closed the surface without delivering a token.
    pub fn abandon(&self, surface: SurfaceId) -> bool {
        match self.take(surface) {
            Some(pending) => {
                debug!(surface = %pending.surface, "Surface closed before delivering a token");
                let _ = pending.slot.send(None);
                true
            }
            None => false,
        }
    }
}

struct Registration<'a> {
    relay: &'a HandshakeRelay,
    surface: SurfaceId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.relay.take(self.surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        opened: Mutex<Vec<SurfaceId>>,
        closed: Mutex<Vec<SurfaceId>>,
        fail_open: bool,
        close_delay: Option<Duration>,
    }

    #[async_trait]
    impl SurfaceHost for RecordingHost {
        async fn open(&self, id: SurfaceId, _url: &str) -> anyhow::Result<()> {
            if self.fail_open {
                anyhow::bail!("no windows available");
            }
            self.opened.lock().unwrap().push(id);
            Ok(())
        }

        async fn close(&self, id: SurfaceId) -> anyhow::Result<()> {
            if let Some(delay) = self.close_delay {
                tokio::time::sleep(delay).await;
            }
            self.closed.lock().unwrap().push(id);
            Ok(())
        }
    }

    async fn wait_until_pending(relay: &HandshakeRelay) {
        while relay.pending_count() == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_matching_delivery_resolves_and_closes_surface() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host.clone());

        let waiter = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        wait_until_pending(&relay).await;

        let resolved = relay
            .deliver(&MessageSender::surface(SurfaceId(1)), "ghp_abc".to_string())
            .await;
        assert!(resolved);

        let token = waiter.await.unwrap().unwrap();
        assert_eq!(token.as_deref(), Some("ghp_abc"));
        assert_eq!(*host.closed.lock().unwrap(), vec![SurfaceId(1)]);
        assert_eq!(relay.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_surface_does_not_resolve() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host.clone()).with_timeout(Duration::from_secs(10));

        let waiter = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        wait_until_pending(&relay).await;

        assert!(
            !relay
                .deliver(&MessageSender::surface(SurfaceId(99)), "ghp_x".to_string())
                .await
        );
        assert!(
            !relay
                .deliver(&MessageSender::external(), "ghp_y".to_string())
                .await
        );
        assert_eq!(relay.pending_count(), 1);

        // Only the deadline ends it.
        let token = waiter.await.unwrap().unwrap();
        assert_eq!(token, None);
        assert!(host.closed.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_deregisters_and_leaves_surface_open() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host.clone());

        let token = relay.acquire_token().await.unwrap();
        assert_eq!(token, None);
        assert_eq!(relay.pending_count(), 0);
        assert_eq!(host.opened.lock().unwrap().len(), 1);
        assert!(host.closed.lock().unwrap().is_empty());

        // A late delivery finds nothing to resolve.
        assert!(
            !relay
                .deliver(&MessageSender::surface(SurfaceId(1)), "ghp_late".to_string())
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_close_does_not_lose_token_near_deadline() {
        let host = Arc::new(RecordingHost {
            close_delay: Some(Duration::from_secs(2)),
            ..Default::default()
        });
        let relay = HandshakeRelay::new(host.clone()).with_timeout(Duration::from_secs(10));

        let waiter = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        wait_until_pending(&relay).await;

        tokio::time::sleep(Duration::from_secs(9)).await;
        let resolved = relay
            .deliver(&MessageSender::surface(SurfaceId(1)), "ghp_ok".to_string())
            .await;
        assert!(resolved);

        let token = waiter.await.unwrap().unwrap();
        assert_eq!(token.as_deref(), Some("ghp_ok"));
        assert_eq!(*host.closed.lock().unwrap(), vec![SurfaceId(1)]);
    }

    #[tokio::test]
    async fn test_second_delivery_is_ignored() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host.clone());

        let waiter = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        wait_until_pending(&relay).await;

        let sender = MessageSender::surface(SurfaceId(1));
        assert!(relay.deliver(&sender, "ghp_first".to_string()).await);
        assert!(!relay.deliver(&sender, "ghp_second".to_string()).await);

        let token = waiter.await.unwrap().unwrap();
        assert_eq!(token.as_deref(), Some("ghp_first"));
        assert_eq!(host.closed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_abandon_resolves_none() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host);

        let waiter = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        wait_until_pending(&relay).await;

        assert!(relay.abandon(SurfaceId(1)));
        assert!(!relay.abandon(SurfaceId(1)));
        assert_eq!(waiter.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_failure_is_authentication_error() {
        let host = Arc::new(RecordingHost {
            fail_open: true,
            ..Default::default()
        });
        let relay = HandshakeRelay::new(host);

        let err = relay.acquire_token().await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
        assert_eq!(relay.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_handshakes_get_distinct_surfaces() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host.clone());

        let first = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        let second = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        while relay.pending_count() < 2 {
            tokio::task::yield_now().await;
        }

        assert!(relay.deliver(&MessageSender::surface(SurfaceId(1)), "ghp_one".to_string()).await);
        assert!(relay.deliver(&MessageSender::surface(SurfaceId(2)), "ghp_two".to_string()).await);

        let mut tokens = vec![
            first.await.unwrap().unwrap().unwrap(),
            second.await.unwrap().unwrap().unwrap(),
        ];
        tokens.sort();
        assert_eq!(tokens, vec!["ghp_one".to_string(), "ghp_two".to_string()]);
        assert_eq!(host.opened.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dropping_waiter_deregisters() {
        let host = Arc::new(RecordingHost::default());
        let relay = HandshakeRelay::new(host);

        let waiter = tokio::spawn({
            let relay = relay.clone();
            async move { relay.acquire_token().await }
        });
        wait_until_pending(&relay).await;

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(relay.pending_count(), 0);
    }
}
