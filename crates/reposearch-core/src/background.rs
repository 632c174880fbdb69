//! The long-lived side of the runtime boundary.
//!
//! `Background` owns the session manager and search gateway and answers
//! [`RuntimeMessage`]s. Callers and surfaces talk to it through a
//! [`RuntimePort`]; no Rust error crosses the port, failures travel as the
//! `error` string of the response.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::auth::{MessageSender, Session, SessionManager};
use crate::protocol::{AuthResponse, RuntimeMessage, RuntimeResponse, SearchResponse};
use crate::search::SearchGateway;

/// A message in flight, with the slot its reply goes to.
pub struct Envelope {
    pub sender: MessageSender,
    pub message: RuntimeMessage,
    pub reply: Option<oneshot::Sender<Option<RuntimeResponse>>>,
}

#[derive(Error, Debug)]
pub enum PortError {
    #[error("Background is not running")]
    Disconnected,

    #[error("Background dropped the request without replying")]
    NoReply,
}

/// Sending half of the runtime boundary. Clone is cheap.
#[derive(Clone)]
pub struct RuntimePort {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl RuntimePort {
    /// A port and the inbox to hand to [`Background::serve`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Send a message and wait for its reply.
    pub async fn request(
        &self,
        sender: MessageSender,
        message: RuntimeMessage,
    ) -> Result<Option<RuntimeResponse>, PortError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope {
                sender,
                message,
                reply: Some(reply),
            })
            .map_err(|_| PortError::Disconnected)?;
        response.await.map_err(|_| PortError::NoReply)
    }

    /// Send a message without waiting for a reply.
    pub fn post(&self, sender: MessageSender, message: RuntimeMessage) -> Result<(), PortError> {
        self.tx
            .send(Envelope {
                sender,
                message,
                reply: None,
            })
            .map_err(|_| PortError::Disconnected)
    }
}

pub struct Background {
    session: Arc<SessionManager>,
    search: SearchGateway,
}

impl Background {
    pub fn new(session: Arc<SessionManager>, search: SearchGateway) -> Self {
        Self { session, search }
    }

    /// Answer one message. Token deliveries get no reply.
    pub async fn handle(
        &self,
        sender: MessageSender,
        message: RuntimeMessage,
    ) -> Option<RuntimeResponse> {
        debug!(action = message.action(), surface = ?sender.surface, "Handling message");

        match message {
            RuntimeMessage::SearchRepos { query, org } => {
                let response = match self.search.search(&query, org.as_deref()).await {
                    Ok(repos) => SearchResponse {
                        repos: Some(repos),
                        error: None,
                    },
                    Err(e) if e.is_rate_limit() => {
                        info!(error = %e, "Search rate limited");
                        SearchResponse {
                            repos: None,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Search failed");
                        SearchResponse {
                            repos: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                Some(RuntimeResponse::Search(response))
            }
            RuntimeMessage::Authenticate => {
                let response = match self.session.authenticate().await {
                    Ok(session) => AuthResponse::ok(session),
                    Err(e) => AuthResponse::failed(e),
                };
                Some(RuntimeResponse::Auth(response))
            }
            RuntimeMessage::GetAuthState => {
                let response = match self.session.get_auth_state().await {
                    Ok(session) => AuthResponse::ok(session),
                    Err(e) => {
                        warn!(error = %e, "Could not read auth state");
                        AuthResponse::failed(e)
                    }
                };
                Some(RuntimeResponse::Auth(response))
            }
            RuntimeMessage::Logout => {
                let response = match self.session.logout().await {
                    Ok(()) => AuthResponse::ok(Session::unauthenticated()),
                    Err(e) => AuthResponse::failed(e),
                };
                Some(RuntimeResponse::Auth(response))
            }
            RuntimeMessage::AuthToken { token } => {
                self.session.relay().deliver(&sender, token).await;
                None
            }
        }
    }

    /// Dispatch envelopes until every port is dropped.
    ///
    /// Each message runs on its own task so a pending `authenticate` never
    /// blocks the token delivery that completes it.
    pub async fn serve(self: Arc<Self>, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = inbox.recv().await {
            let background = Arc::clone(&self);
            tokio::spawn(async move {
                let response = background.handle(envelope.sender, envelope.message).await;
                if let Some(reply) = envelope.reply {
                    // The caller may have stopped waiting.
                    let _ = reply.send(response);
                }
            });
        }
        debug!("All runtime ports closed");
    }
}
