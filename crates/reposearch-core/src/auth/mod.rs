//! Authentication module for managing the GitHub session.
//!
//! This module provides:
//! - `Session`: the persisted authenticated/unauthenticated record
//! - `CredentialStore`: durable storage for it (file, OS keychain, memory)
//! - `HandshakeRelay`: collects a token from a transient surface
//! - `SessionManager`: the one authority that ties these together
//!
//! Tokens do not expire on a schedule; a token is dropped when GitHub
//! rejects it during validation, or on logout.

pub mod credentials;
pub mod manager;
pub mod relay;
pub mod session;

pub use credentials::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
    StoreError,
};
pub use manager::{anonymous_headers, SessionManager};
pub use relay::{
    HandshakeRelay, MessageSender, PendingHandshake, SurfaceHost, SurfaceId, AUTH_ENTRY_URL,
    DEFAULT_HANDSHAKE_TIMEOUT,
};
pub use session::{check_token_format, Session, STORAGE_KEY};
