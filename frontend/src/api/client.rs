use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, RequestBuilder, Response};
use tokio::sync::{broadcast, RwLock};

use crate::{
    api::types::{ApiError, AuthChangeEvent, AuthEvent, Session},
    config::Config,
};

const EVENT_CAPACITY: usize = 16;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// HTTPS client for the hosted backend.
///
/// Holds the current session in memory and broadcasts every change to it.
/// Cloning is cheap and clones share the session and the notification channel.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(
            client,
            &config.supabase_url,
            &config.supabase_anon_key,
        ))
    }

    pub fn new_with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        let base_url: String = base_url.into();
        let api_key: String = api_key.into();
        Self::with_client(client, base_url, api_key)
    }

    fn with_client(client: Client, base_url: impl AsRef<str>, api_key: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session: Arc::new(RwLock::new(None)),
            events,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.api_key)
    }

    pub(crate) async fn rest_request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self.bearer().await;
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    /// Row-level security runs as the signed-in user when there is one,
    /// otherwise as the anonymous role.
    async fn bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.api_key.clone(),
        }
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Seeds the client with a session persisted elsewhere.
    pub async fn restore_session(&self, session: Session) {
        self.store_session(Some(session), AuthChangeEvent::InitialSession)
            .await;
    }

    pub(crate) async fn store_session(&self, session: Option<Session>, event: AuthChangeEvent) {
        {
            let mut current = self.session.write().await;
            *current = session.clone();
        }
        tracing::debug!(event = ?event, "session changed");
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(AuthEvent::new(event, session));
    }

    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Sends the request and turns transport failures and non-2xx statuses
    /// into [`ApiError`].
    pub(crate) async fn execute(request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_body(status.as_u16(), &body))
    }
}
