//! Auth data models.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zeroize::Zeroize;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable user id.
    pub id: String,

    /// Sign-in email.
    #[serde(default)]
    pub email: Option<String>,

    /// Free-form profile data supplied at sign-up (name, role, ...).
    #[serde(default)]
    pub user_metadata: Map<String, Value>,

    /// When the account was created.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl User {
    /// The `role` entry of the user's metadata, if any.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.user_metadata.get("role").and_then(Value::as_str)
    }
}

/// A signed-in session. Token fields are wiped when the session is dropped.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for data requests.
    pub access_token: String,

    /// Always `bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime of the access token in seconds.
    pub expires_in: i64,

    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// Opaque token exchanged for a new session.
    pub refresh_token: String,

    /// The signed-in user.
    pub user: User,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= now.as_second())
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Session")
            .field("access_token", &"**redacted**")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &"**redacted**")
            .field("user", &self.user)
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Result of a sign-in or sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    /// The affected user.
    pub user: Option<User>,
    /// The new session; `None` when sign-up awaits confirmation.
    pub session: Option<Session>,
}

impl AuthResponse {
    /// A response carrying `session` and its user.
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            user: Some(session.user.clone()),
            session: Some(session),
        }
    }
}

/// Session transitions delivered to auth state listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was created.
    SignedIn,
    /// The session was cleared.
    SignedOut,
    /// The session was replaced by a refresh.
    TokenRefreshed,
    /// The user metadata changed.
    UserUpdated,
}

impl AuthEvent {
    /// Event name as used by hosted auth clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        }
    }
}
