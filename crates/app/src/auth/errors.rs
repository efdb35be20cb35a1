//! Auth errors.

use barberbook_core::storage::StorageError;
use thiserror::Error;

use crate::{auth::TokenError, remote::RemoteError};

/// Errors raised by auth providers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are not distinguished.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The operation needs a current session.
    #[error("no user is signed in")]
    NotSignedIn,

    /// The session could not be persisted.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),

    /// The hosted auth service failed.
    #[error("hosted auth error: {0}")]
    Remote(#[source] RemoteError),

    /// A token could not be issued or decoded.
    #[error("token processing error: {0}")]
    Token(#[from] TokenError),
}

impl From<RemoteError> for AuthError {
    fn from(error: RemoteError) -> Self {
        Self::Remote(error)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Remote(RemoteError::Http(error))
    }
}
