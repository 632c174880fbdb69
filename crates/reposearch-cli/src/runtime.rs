//! Process wiring: one session manager, one background, one port.

use std::sync::Arc;

use anyhow::{Context, Result};
use reposearch_core::api::GitHubClient;
use reposearch_core::auth::{
    CredentialStore, HandshakeRelay, MemoryCredentialStore, SessionManager,
};
use reposearch_core::{Background, Config, RuntimePort, SearchGateway};
use tracing::debug;

use crate::surface::TerminalSurface;

pub struct Runtime {
    pub port: RuntimePort,
    pub surface: Arc<TerminalSurface>,
}

impl Runtime {
    /// Build the services and start the background dispatcher.
    pub fn start(config: &Config, ephemeral: bool) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = if ephemeral {
            Arc::new(MemoryCredentialStore::new())
        } else {
            config
                .credential_store()
                .context("Failed to open credential store")?
        };

        let client = GitHubClient::with_base_url(config.api_base_url())
            .context("Failed to create HTTP client")?;

        let (port, inbox) = RuntimePort::channel();
        let (surface, mut cancelled) = TerminalSurface::new(port.clone());
        let surface = Arc::new(surface);
        let relay = HandshakeRelay::new(surface.clone()).with_timeout(config.handshake_timeout());

        let session = Arc::new(SessionManager::new(store, relay.clone(), client.clone()));
        let search = SearchGateway::new(client, session.clone());
        let background = Arc::new(Background::new(session, search));

        tokio::spawn(background.serve(inbox));
        tokio::spawn(async move {
            while let Some(surface) = cancelled.recv().await {
                relay.abandon(surface);
            }
        });

        debug!(api = %config.api_base_url(), ephemeral, "Runtime started");
        Ok(Self { port, surface })
    }
}
