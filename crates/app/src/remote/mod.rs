//! Hosted Backend Client
//!
//! Translates query plans to the hosted backend's REST dialect
//! (`/rest/v1/<table>`) and procedures to `/rest/v1/rpc/<name>`.

use async_trait::async_trait;
use barberbook_core::{
    context::CallerContext,
    plan::{Action, QueryPlan},
    records::Record,
    storage::Persistence,
    tables::Table,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    auth::{SESSION_KEY, Session},
    datasource::{Backend, DataSource},
    errors::DataError,
};

mod params;

pub use params::{match_all_params, query_params};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL, e.g. `"https://project.example.co"`.
    pub url: String,

    /// Public API key sent with every request.
    pub anon_key: String,
}

impl RemoteConfig {
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.url.trim_end_matches('/'))
    }
}

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a non-2xx response or unexpected body.
    #[error("unexpected response from hosted backend: {0}")]
    UnexpectedResponse(String),
}

/// HTTP data source for the hosted backend.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    config: RemoteConfig,
    http: Client,
    sessions: Option<Persistence>,
}

impl RemoteClient {
    /// Create a new client from the given configuration. Requests are sent
    /// with the public API key only.
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            http: Client::new(),
            sessions: None,
        }
    }

    /// Send the access token of the session stored in `sessions`, when there
    /// is one, instead of the public API key.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Persistence) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn table_url(&self, table: Table) -> String {
        self.config.endpoint(&format!("rest/v1/{table}"))
    }

    fn bearer_token(&self) -> String {
        let Some(sessions) = &self.sessions else {
            return self.config.anon_key.clone();
        };

        match sessions.get_value::<Session>(SESSION_KEY) {
            Ok(Some(session)) => session.access_token.clone(),
            Ok(None) => self.config.anon_key.clone(),
            Err(error) => {
                warn!(error = %error, "ignoring unreadable session");
                self.config.anon_key.clone()
            }
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer_token())
    }

    fn returning(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorized(request)
            .header("Prefer", "return=representation")
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Record>, RemoteError> {
        let url = self.table_url(plan.table);
        let params = query_params(plan);

        let request = match &plan.action {
            Action::Select => self.authorized(self.http.get(&url)),
            Action::Update(payload) => self.returning(self.http.patch(&url)).json(payload),
            Action::Delete => self.returning(self.http.delete(&url)),
        };

        let mut rows: Vec<Record> = read_json(request.query(&params).send().await?, &url).await?;

        if plan.action != Action::Select {
            plan.finish(&mut rows);
        }

        Ok(rows)
    }

    async fn post_rows(&self, table: Table, rows: &[Record]) -> Result<Vec<Record>, RemoteError> {
        let url = self.table_url(table);

        let response = self
            .returning(self.http.post(&url))
            .json(rows)
            .send()
            .await?;

        read_json(response, &url).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, RemoteError> {
    let response = ensure_success(response, url).await?;

    Ok(response.json().await?)
}

async fn ensure_success(response: Response, url: &str) -> Result<Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    Err(RemoteError::UnexpectedResponse(format!(
        "request to {url} failed with status {status}: {text}"
    )))
}

#[async_trait]
impl DataSource for RemoteClient {
    async fn execute(&self, plan: QueryPlan) -> Result<Vec<Record>, DataError> {
        let rows = self.fetch(&plan).await?;

        debug!(table = %plan.table, rows = rows.len(), "hosted query finished");

        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Record>) -> Result<Vec<Record>, DataError> {
        Ok(self.post_rows(table, &rows).await?)
    }

    async fn rpc(&self, name: &str, params: Value) -> Result<Value, DataError> {
        let url = self.config.endpoint(&format!("rest/v1/rpc/{name}"));

        let response = self
            .authorized(self.http.post(&url))
            .json(&params)
            .send()
            .await
            .map_err(RemoteError::from)?;

        Ok(read_json(response, &url).await?)
    }

    async fn dump(&self, table: Table) -> Result<Vec<Record>, DataError> {
        self.execute(QueryPlan::new(table)).await
    }

    async fn replace(&self, table: Table, rows: Vec<Record>) -> Result<(), DataError> {
        let url = self.table_url(table);

        let response = self
            .authorized(self.http.delete(&url))
            .query(&match_all_params())
            .send()
            .await
            .map_err(RemoteError::from)?;

        ensure_success(response, &url).await?;

        if !rows.is_empty() {
            self.post_rows(table, &rows).await?;
        }

        Ok(())
    }

    fn set_context(&self, _context: CallerContext) {
        // Row visibility is enforced by the hosted backend itself.
    }

    fn backend(&self) -> Backend {
        Backend::Remote
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            url: "https://backend.example.com".to_string(),
            anon_key: "anon".to_string(),
        }
    }

    #[test]
    fn bearer_falls_back_to_the_public_key() -> TestResult {
        let sessions = Persistence::in_memory();
        let client = RemoteClient::new(config()).with_sessions(sessions.clone());

        assert_eq!(client.bearer_token(), "anon");

        sessions.set_value(
            SESSION_KEY,
            &json!({
                "access_token": "user-token",
                "expires_in": 3600,
                "refresh_token": "refresh",
                "user": { "id": "u1" },
            }),
        )?;

        assert_eq!(client.bearer_token(), "user-token");

        Ok(())
    }

    #[test]
    fn endpoints_ignore_trailing_slashes() {
        let client = RemoteClient::new(RemoteConfig {
            url: "https://backend.example.com/".to_string(),
            anon_key: "anon".to_string(),
        });

        assert_eq!(
            client.table_url(Table::Services),
            "https://backend.example.com/rest/v1/services"
        );
        assert_eq!(
            client.config().endpoint("rest/v1/rpc/create_barbershop_with_defaults"),
            "https://backend.example.com/rest/v1/rpc/create_barbershop_with_defaults"
        );
    }
}
