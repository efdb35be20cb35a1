//! Local auth simulation.
//!
//! Checks credentials against a fixed set of demo accounts and persists the
//! session next to the tables.

use async_trait::async_trait;
use barberbook_core::{
    context::Role,
    storage::Persistence,
    store::{ADMIN_EMAIL, ADMIN_USER_ID},
};
use jiff::Timestamp;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    AuthCallback, AuthError, AuthEvent, AuthProvider, AuthResponse, Listeners, Session,
    Subscription, User, issue_session,
};

/// Name of the persisted session value.
pub const SESSION_KEY: &str = "session";

struct DemoAccount {
    id: &'static str,
    email: &'static str,
    /// Hex SHA-256 of the password.
    password_sha256: &'static str,
    full_name: &'static str,
    role: Role,
}

const DEMO_ACCOUNTS: [DemoAccount; 3] = [
    DemoAccount {
        id: ADMIN_USER_ID,
        email: ADMIN_EMAIL,
        password_sha256: "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9",
        full_name: "Administrador",
        role: Role::Admin,
    },
    DemoAccount {
        id: "00000000-0000-4000-8000-000000000002",
        email: "barbearia@barberbook.local",
        password_sha256: "d92971a5be637239b586dff99e0eaba7f4319077f086e66c30ef3bb43aad3f38",
        full_name: "Barbearia Demo",
        role: Role::Barbershop,
    },
    DemoAccount {
        id: "00000000-0000-4000-8000-000000000003",
        email: "cliente@barberbook.local",
        password_sha256: "09a31a7001e261ab1e056182a71d3cf57f582ca9a29cff5eb83be0f0549730a9",
        full_name: "Cliente Demo",
        role: Role::Client,
    },
];

impl DemoAccount {
    fn accepts(&self, email: &str, password: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
            && format!("{:x}", Sha256::digest(password.as_bytes())) == self.password_sha256
    }

    fn user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.to_string()),
            user_metadata: metadata(json!({
                "full_name": self.full_name,
                "role": self.role.as_str(),
            })),
            created_at: None,
        }
    }
}

/// Auth provider backed by demo accounts and local persistence.
#[derive(Debug, Clone)]
pub struct SimulatedAuth {
    persistence: Persistence,
    listeners: Listeners,
}

impl SimulatedAuth {
    /// Demo-account auth keeping its session in `persistence`.
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self {
            persistence,
            listeners: Listeners::default(),
        }
    }

    fn start_session(&self, user: User, event: AuthEvent) -> Result<Session, AuthError> {
        let session = issue_session(user, Timestamp::now())?;

        self.persistence.set_value(SESSION_KEY, &session)?;
        self.listeners.notify(event, Some(&session));

        Ok(session)
    }

    fn stored_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.persistence.get_value(SESSION_KEY)?)
    }
}

#[async_trait]
impl AuthProvider for SimulatedAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        let Some(account) = DEMO_ACCOUNTS
            .iter()
            .find(|account| account.accepts(email, password))
        else {
            warn!(email, "rejected sign-in");
            return Err(AuthError::InvalidCredentials);
        };

        let session = self.start_session(account.user(), AuthEvent::SignedIn)?;

        info!(user_id = account.id, role = account.role.as_str(), "signed in");

        Ok(AuthResponse::signed_in(session))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata_value: Value,
    ) -> Result<AuthResponse, AuthError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.trim().to_string()),
            user_metadata: metadata(metadata_value),
            created_at: Some(Timestamp::now()),
        };

        let session = self.start_session(user, AuthEvent::SignedIn)?;

        info!(user_id = %session.user.id, "signed up");

        Ok(AuthResponse::signed_in(session))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.persistence.remove_value(SESSION_KEY)?;
        self.listeners.notify(AuthEvent::SignedOut, None);

        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.stored_session()
    }

    async fn refresh_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(current) = self.stored_session()? else {
            return Ok(None);
        };

        let session = self.start_session(current.user.clone(), AuthEvent::TokenRefreshed)?;

        Ok(Some(session))
    }

    async fn update_user(&self, metadata_value: Value) -> Result<User, AuthError> {
        let mut session = self.stored_session()?.ok_or(AuthError::NotSignedIn)?;

        session.user.user_metadata.extend(metadata(metadata_value));

        self.persistence.set_value(SESSION_KEY, &session)?;
        self.listeners.notify(AuthEvent::UserUpdated, Some(&session));

        Ok(session.user.clone())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }
}

fn metadata(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use testresult::TestResult;

    use super::*;

    fn auth() -> SimulatedAuth {
        SimulatedAuth::new(Persistence::in_memory())
    }

    #[tokio::test]
    async fn demo_credentials_sign_in_and_persist_the_session() -> TestResult {
        let auth = auth();

        let response = auth
            .sign_in_with_password("admin@barberbook.local", "admin123")
            .await?;
        let stored = auth.get_session().await?;

        assert_eq!(response.user.as_ref().and_then(User::role), Some("admin"));
        assert_eq!(stored, response.session);

        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() -> TestResult {
        let auth = auth();

        let wrong_password = auth
            .sign_in_with_password("admin@barberbook.local", "nope")
            .await;
        let unknown_email = auth
            .sign_in_with_password("ghost@barberbook.local", "admin123")
            .await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
        assert!(auth.get_session().await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn sign_up_always_issues_a_fresh_user() -> TestResult {
        let auth = auth();

        let first = auth
            .sign_up("novo@barberbook.local", "secret", json!({ "full_name": "Novo" }))
            .await?;
        let second = auth
            .sign_up("novo@barberbook.local", "secret", json!({}))
            .await?;

        let first_id = first.user.map(|user| user.id);
        let second_id = second.user.map(|user| user.id);

        assert!(first_id.is_some(), "sign-up returns a user");
        assert_ne!(first_id, second_id);

        Ok(())
    }

    #[tokio::test]
    async fn sign_out_twice_is_not_an_error() -> TestResult {
        let auth = auth();
        auth.sign_in_with_password("cliente@barberbook.local", "cliente123")
            .await?;

        auth.sign_out().await?;
        auth.sign_out().await?;

        assert!(auth.get_session().await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn refresh_rotates_tokens_and_notifies() -> TestResult {
        let auth = auth();
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);

        let _subscription = auth.on_auth_state_change(Arc::new(move |event, _| {
            if let Ok(mut events) = seen.lock() {
                events.push(event);
            }
        }));

        let signed_in = auth
            .sign_in_with_password("barbearia@barberbook.local", "barbearia123")
            .await?
            .session
            .ok_or("missing session")?;
        let refreshed = auth.refresh_session().await?.ok_or("missing session")?;

        assert_ne!(signed_in.refresh_token, refreshed.refresh_token);
        assert_eq!(signed_in.user, refreshed.user);
        assert_eq!(
            *events.lock().map_err(|_poisoned| "poisoned")?,
            [AuthEvent::SignedIn, AuthEvent::TokenRefreshed]
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_user_requires_a_session() -> TestResult {
        let auth = auth();

        assert!(matches!(
            auth.update_user(json!({ "phone": "1" })).await,
            Err(AuthError::NotSignedIn)
        ));

        auth.sign_in_with_password("cliente@barberbook.local", "cliente123")
            .await?;
        let user = auth.update_user(json!({ "phone": "1" })).await?;

        assert_eq!(user.user_metadata.get("phone"), Some(&json!("1")));
        assert_eq!(user.role(), Some("client"));

        Ok(())
    }
}
