//! Auth provider interface.

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

use crate::auth::{AuthCallback, AuthError, AuthResponse, Session, Subscription, User};

/// Identity surface shared by the simulated and hosted auth clients.
#[automock]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password, persisting the new session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError>;

    /// Register a new user; `metadata` becomes the user's metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthResponse, AuthError>;

    /// Drop the current session. Signing out twice is not an error.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The persisted session, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    /// Rotate the tokens of the current session, if any.
    async fn refresh_session(&self) -> Result<Option<Session>, AuthError>;

    /// Merge `metadata` into the signed-in user's metadata.
    async fn update_user(&self, metadata: Value) -> Result<User, AuthError>;

    /// Register a listener for session transitions.
    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription;
}
