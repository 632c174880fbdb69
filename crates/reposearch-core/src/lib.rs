//! Core library for reposearch.
//!
//! Searches GitHub repositories, optionally within an organization, and
//! manages the token that lifts the anonymous rate limit:
//!
//! - [`auth`]: session record, credential storage, token handshake and the
//!   `SessionManager` that owns them
//! - [`api`]: GitHub HTTP client and the error taxonomy
//! - [`search`]: the search gateway used by presentation surfaces
//! - [`background`]: message dispatch across the runtime boundary
//!
//! Wiring happens once at startup:
//!
//! ```no_run
//! use std::sync::Arc;
//! use reposearch_core::{
//!     api::GitHubClient,
//!     auth::{HandshakeRelay, MemoryCredentialStore, SessionManager, SurfaceHost},
//!     background::Background,
//!     search::SearchGateway,
//! };
//!
//! # fn wire(host: Arc<dyn SurfaceHost>) -> Result<Background, reposearch_core::ApiError> {
//! let client = GitHubClient::new()?;
//! let session = Arc::new(SessionManager::new(
//!     Arc::new(MemoryCredentialStore::new()),
//!     HandshakeRelay::new(host),
//!     client.clone(),
//! ));
//! let search = SearchGateway::new(client, session.clone());
//! Ok(Background::new(session, search))
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod background;
pub mod config;
pub mod models;
pub mod protocol;
pub mod search;

pub use api::ApiError;
pub use auth::{Session, SessionManager};
pub use background::{Background, RuntimePort};
pub use config::Config;
pub use models::Repo;
pub use protocol::{AuthResponse, RuntimeMessage, RuntimeResponse, SearchResponse};
pub use search::SearchGateway;
