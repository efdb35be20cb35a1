//! Hosted auth client.

use async_trait::async_trait;
use barberbook_core::storage::Persistence;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    auth::{
        AuthCallback, AuthError, AuthEvent, AuthProvider, AuthResponse, Listeners, SESSION_KEY,
        Session, Subscription, User,
    },
    remote::{RemoteConfig, RemoteError},
};

/// Auth provider for the hosted backend's `/auth/v1` endpoints. The session
/// is persisted locally like the simulated provider's.
#[derive(Debug, Clone)]
pub struct RemoteAuth {
    config: RemoteConfig,
    http: Client,
    persistence: Persistence,
    listeners: Listeners,
}

impl RemoteAuth {
    #[must_use]
    pub fn new(config: RemoteConfig, persistence: Persistence) -> Self {
        Self {
            config,
            http: Client::new(),
            persistence,
            listeners: Listeners::default(),
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.config.endpoint(path))
            .header("apikey", &self.config.anon_key)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
        let response = self
            .post("auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
        ) {
            warn!(grant_type, "hosted auth rejected token grant");
            return Err(AuthError::InvalidCredentials);
        }

        read_json(response, "token grant").await
    }

    fn store_session(&self, session: &Session, event: AuthEvent) -> Result<(), AuthError> {
        self.persistence.set_value(SESSION_KEY, session)?;
        self.listeners.notify(event, Some(session));

        Ok(())
    }

    fn stored_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.persistence.get_value(SESSION_KEY)?)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, AuthError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        return Err(AuthError::Remote(RemoteError::UnexpectedResponse(format!(
            "{what} failed with status {status}: {text}"
        ))));
    }

    Ok(response.json().await?)
}

#[async_trait]
impl AuthProvider for RemoteAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;

        self.store_session(&session, AuthEvent::SignedIn)?;

        info!(user_id = %session.user.id, "signed in to hosted backend");

        Ok(AuthResponse::signed_in(session))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthResponse, AuthError> {
        let response = self
            .post("auth/v1/signup")
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;

        let body: Value = read_json(response, "sign-up").await?;

        // Without email confirmation the backend answers with a session,
        // otherwise with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|error| RemoteError::UnexpectedResponse(error.to_string()))?;

            self.store_session(&session, AuthEvent::SignedIn)?;

            return Ok(AuthResponse::signed_in(session));
        }

        let user: User = serde_json::from_value(body)
            .map_err(|error| RemoteError::UnexpectedResponse(error.to_string()))?;

        Ok(AuthResponse {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.stored_session()? {
            let response = self
                .post("auth/v1/logout")
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            // An already revoked token is as good as a successful logout.
            if !response.status().is_success() {
                warn!(status = %response.status(), "hosted logout failed");
            }
        }

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

        let session = self
            .token_grant(
                "refresh_token",
                json!({ "refresh_token": current.refresh_token }),
            )
            .await?;

        self.store_session(&session, AuthEvent::TokenRefreshed)?;

        Ok(Some(session))
    }

    async fn update_user(&self, metadata: Value) -> Result<User, AuthError> {
        let mut session = self.stored_session()?.ok_or(AuthError::NotSignedIn)?;

        let response = self
            .http
            .put(self.config.endpoint("auth/v1/user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .json(&json!({ "data": metadata }))
            .send()
            .await?;

        let user: User = read_json(response, "user update").await?;

        session.user = user.clone();
        self.store_session(&session, AuthEvent::UserUpdated)?;

        Ok(user)
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }
}
