//! Client-side auth session.
//!
//! [`AuthSession`] owns the signed-in user for the lifetime of the client
//! and mirrors it to a [`SecureStore`] under two keys, [`TOKEN_KEY`] and
//! [`USER_KEY`]. It starts in [`SessionState::Loading`] until [`AuthSession::load`]
//! has read storage, then moves between `Unauthenticated` and
//! `Authenticated` only through `sign_in` and `sign_out`.
//!
//! Failure policy:
//! - a storage read failure during `load` is logged and treated as "no session"
//! - a storage write/delete failure during `sign_in`/`sign_out` is logged and
//!   returned, and the in-memory state is left as it was

mod store;

pub use store::{EncryptedFileStore, MemoryStore, SecureStore, StoreError};

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::db::UserResponse;

/// Storage slot for the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage slot for the JSON-serialized user profile
pub const USER_KEY: &str = "user";

/// Profile cached for the signed-in user
pub type UserProfile = UserResponse;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("failed to serialize user profile: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Unauthenticated,
    Authenticated { user: UserProfile, token: String },
}

pub struct AuthSession {
    store: Arc<dyn SecureStore>,
    state: watch::Sender<SessionState>,
}

impl AuthSession {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { store, state }
    }

    /// Create a session and immediately restore it from storage
    pub async fn restore(store: Arc<dyn SecureStore>) -> Self {
        let session = Self::new(store);
        session.load().await;
        session
    }

    /// Restore the session persisted by a previous run. Never fails.
    pub async fn load(&self) {
        let next = match self.read_stored().await {
            Ok(Some((user, token))) => {
                info!(user_id = %user.id, "Restored session from storage");
                SessionState::Authenticated { user, token }
            }
            Ok(None) => SessionState::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "Failed to load user from storage");
                SessionState::Unauthenticated
            }
        };
        self.state.send_replace(next);
    }

    async fn read_stored(&self) -> Result<Option<(UserProfile, String)>, SessionError> {
        let user_json = self.store.get(USER_KEY).await?;
        let token = self.store.get(TOKEN_KEY).await?;

        match (user_json, token) {
            (Some(user_json), Some(token)) => {
                let user: UserProfile = serde_json::from_str(&user_json)?;
                Ok(Some((user, token)))
            }
            _ => Ok(None),
        }
    }

    /// Persist credentials, then mark the session authenticated
    pub async fn sign_in(&self, token: &str, user: UserProfile) -> Result<(), SessionError> {
        if let Err(e) = self.write_credentials(token, &user).await {
            error!(error = %e, "Error storing auth data");
            return Err(e);
        }

        info!(user_id = %user.id, "Signed in");
        self.state.send_replace(SessionState::Authenticated {
            user,
            token: token.to_string(),
        });
        Ok(())
    }

    async fn write_credentials(&self, token: &str, user: &UserProfile) -> Result<(), SessionError> {
        let user_json = serde_json::to_string(user)?;
        self.store.set(TOKEN_KEY, token).await?;
        self.store.set(USER_KEY, &user_json).await?;
        Ok(())
    }

    /// Remove persisted credentials, then mark the session unauthenticated
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        if let Err(e) = self.clear_credentials().await {
            error!(error = %e, "Error removing auth data");
            return Err(e);
        }

        info!("Signed out");
        self.state.send_replace(SessionState::Unauthenticated);
        Ok(())
    }

    async fn clear_credentials(&self) -> Result<(), SessionError> {
        self.store.delete(TOKEN_KEY).await?;
        self.store.delete(USER_KEY).await?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &*self.state.borrow() {
            SessionState::Authenticated { user, .. } => Some(user.clone()),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<String> {
        match &*self.state.borrow() {
            SessionState::Authenticated { token, .. } => Some(token.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated { .. })
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Loading)
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
