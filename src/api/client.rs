use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::{header, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use super::cache::ResponseCache;
use crate::config::{ClientSettings, Credentials, Environment};
use crate::error::{truncate_body, AuthError, RequestError};
use crate::oauth::{self, Token};

/// Where a client stands with respect to authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never authenticated, disconnected, or the last attempt failed.
    NoToken,
    Authenticated,
    /// A token is held but past its expiry; the next request re-authenticates.
    Expired,
}

/// Per-request knobs for [`ApiClient::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Serve a fresh cached response instead of hitting the network.
    pub use_cache: bool,
    /// Overrides the client's default cache duration for this request.
    pub cache_duration: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_duration: None,
        }
    }
}

impl RequestOptions {
    /// Always go to the network. The response is still cached.
    pub fn bypass_cache() -> Self {
        Self {
            use_cache: false,
            cache_duration: None,
        }
    }

    pub fn cached_for(cache_duration: Duration) -> Self {
        Self {
            use_cache: true,
            cache_duration: Some(cache_duration),
        }
    }
}

/// An authenticated client for one tenant.
///
/// Each client owns its token and response cache, so separate sessions
/// should use separate clients. A client can be shared between tasks
/// behind an `Arc`: the token lock is held for the whole token exchange,
/// so concurrent requests that find the token missing or expired wait for
/// a single authentication instead of each starting their own.
pub struct ApiClient {
    credentials: Credentials,
    settings: ClientSettings,
    environment: Environment,
    /// Reused across calls for connection pooling.
    client: reqwest::Client,
    token: Mutex<Option<Token>>,
    cache: StdMutex<ResponseCache>,
}

impl ApiClient {
    /// Creates a client with its own HTTP connection pool.
    pub fn new(credentials: Credentials, settings: ClientSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self::with_client(credentials, settings, client))
    }

    /// Creates a client around an existing [`reqwest::Client`].
    ///
    /// The client's own timeout applies; `settings.timeout` is not re-applied.
    pub fn with_client(
        credentials: Credentials,
        settings: ClientSettings,
        client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            settings,
            environment: Environment::default(),
            client,
            token: Mutex::new(None),
            cache: StdMutex::new(ResponseCache::new()),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Obtains a new token and replaces the current one.
    ///
    /// On failure the current token, if any, is left as it was.
    pub async fn authenticate(&self) -> Result<Token, AuthError> {
        let mut token = self.token.lock().await;
        self.authenticate_locked(&mut token).await
    }

    async fn authenticate_locked(&self, slot: &mut Option<Token>) -> Result<Token, AuthError> {
        tracing::info!(
            base_url = %self.credentials.base_url(),
            user_id = %self.credentials.user_id(),
            "Authenticating"
        );

        match oauth::request_token(&self.client, &self.credentials).await {
            Ok(fresh) => {
                tracing::info!(expires_at = %fresh.expires_at(), "Authenticated");
                *slot = Some(fresh.clone());
                Ok(fresh)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Authentication failed");
                Err(error)
            }
        }
    }

    /// Returns the current access token, authenticating first if there is
    /// none or it has expired.
    async fn valid_access_token(&self) -> Result<String, AuthError> {
        // We keep the lock through authentication, so anyone queued behind us
        // picks up the token we obtain instead of requesting another.
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|current| !current.is_expired()) {
            return Ok(current.access_token().to_string());
        }

        let fresh = self.authenticate_locked(&mut token).await?;
        Ok(fresh.access_token().to_string())
    }

    /// Performs an authenticated GET against `{base_url}{endpoint}` and
    /// returns the decoded JSON body.
    ///
    /// `endpoint` includes any query string; the whole string is the cache key.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, RequestError> {
        // A fresh cached copy means we don't need the network at all.
        if options.use_cache {
            let max_age = options.cache_duration.unwrap_or(self.settings.cache_duration);
            let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
            let cached = self.cache().get_fresh(endpoint, Utc::now(), max_age).cloned();
            if let Some(payload) = cached {
                tracing::debug!(endpoint, "Serving cached response");
                return Ok(payload);
            }
        }

        // We need a usable token first. If authentication fails, the GET is
        // never sent.
        let access_token = self.valid_access_token().await?;
        let url = format!("{}{}", self.credentials.base_url(), endpoint);
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| RequestError::transport(endpoint, error))?;

        // We'll hold on to the body either way: it is either our payload or
        // the explanation for a failure.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| RequestError::transport(endpoint, error))?;

        // A non-200 says nothing about the token (it is often just a 404 for
        // a resource this tenant lacks), so we keep it and skip the cache.
        if status != StatusCode::OK {
            tracing::warn!(endpoint, status = status.as_u16(), "API request failed");
            return Err(RequestError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|source| RequestError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })?;

        // Only a fully decoded payload makes it into the cache.
        tracing::debug!(
            endpoint,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched response"
        );
        self.cache().insert(endpoint, payload.clone(), Utc::now());
        Ok(payload)
    }

    /// [`request`](Self::request) with default options.
    pub async fn get(&self, endpoint: &str) -> Result<Value, RequestError> {
        self.request(endpoint, RequestOptions::default()).await
    }

    pub async fn state(&self) -> ConnectionState {
        match self.token.lock().await.as_ref() {
            None => ConnectionState::NoToken,
            Some(token) if token.is_expired() => ConnectionState::Expired,
            Some(_) => ConnectionState::Authenticated,
        }
    }

    pub async fn current_token(&self) -> Option<Token> {
        self.token.lock().await.clone()
    }

    /// Time until the current token expires, zero once it has.
    pub async fn token_remaining(&self) -> Option<chrono::Duration> {
        self.token
            .lock()
            .await
            .as_ref()
            .map(|token| token.remaining_at(Utc::now()))
    }

    /// Installs a token obtained earlier, e.g. to resume a session.
    pub async fn restore_token(&self, token: Token) {
        *self.token.lock().await = Some(token);
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    pub fn cached_responses(&self) -> usize {
        self.cache().len()
    }

    /// Forgets the token and every cached response.
    pub async fn disconnect(&self) {
        *self.token.lock().await = None;
        self.clear_cache();
        tracing::info!("Disconnected");
    }

    // Never held across an await. Every map operation leaves it consistent.
    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let credentials =
            Credentials::new("acme", "s3cret", "admin01", "http://127.0.0.1:9").unwrap();
        ApiClient::new(credentials, ClientSettings::default()).unwrap()
    }

    #[test]
    fn default_options_use_the_cache() {
        let options = RequestOptions::default();
        assert!(options.use_cache);
        assert_eq!(options.cache_duration, None);

        assert!(!RequestOptions::bypass_cache().use_cache);
        assert_eq!(
            RequestOptions::cached_for(Duration::from_secs(60)).cache_duration,
            Some(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn new_client_has_no_token() {
        let client = client();

        assert_eq!(client.state().await, ConnectionState::NoToken);
        assert!(client.current_token().await.is_none());
        assert!(client.token_remaining().await.is_none());
        assert_eq!(client.cached_responses(), 0);
    }

    #[tokio::test]
    async fn restored_tokens_report_their_state() {
        let client = client();

        client.restore_token(Token::issue("fresh", Utc::now())).await;
        assert_eq!(client.state().await, ConnectionState::Authenticated);
        let remaining = client.token_remaining().await.unwrap();
        assert!(remaining > chrono::Duration::minutes(59));

        client
            .restore_token(Token::issue("stale", Utc::now() - chrono::Duration::hours(2)))
            .await;
        assert_eq!(client.state().await, ConnectionState::Expired);
        assert_eq!(client.token_remaining().await, Some(chrono::Duration::zero()));

        client.disconnect().await;
        assert_eq!(client.state().await, ConnectionState::NoToken);
    }

    #[tokio::test]
    async fn cache_hit_needs_no_network() {
        let client = client();
        client
            .cache()
            .insert("/cached", serde_json::json!({"value": []}), Utc::now());

        // Nothing listens on port 9, so only a cache hit can succeed.
        let payload = client.get("/cached").await.unwrap();
        assert_eq!(payload, serde_json::json!({"value": []}));
    }
}
