use chrono::Utc;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};

use super::Token;
use crate::config::Credentials;
use crate::error::{truncate_body, AuthError};

/// Path of the token endpoint, relative to the tenant base URL.
pub const TOKEN_ENDPOINT_PATH: &str = "/learning/oauth-api/rest/v1/token";

/// The body POSTed to the token endpoint.
///
/// This is a client-credentials grant, but not the usual form-encoded one:
/// the vendor expects JSON, and `scope` is an object rather than a
/// space-delimited string. Field order matches what the endpoint is known
/// to accept.
#[derive(Serialize, Debug)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub scope: TokenScope<'a>,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Who the token is issued for.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenScope<'a> {
    pub user_id: &'a str,
    /// The tenant identifies the company by the OAuth client id.
    pub company_id: &'a str,
    pub user_type: &'static str,
    pub resource_type: &'static str,
}

impl<'a> TokenRequest<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self {
            grant_type: "client_credentials",
            scope: TokenScope {
                user_id: credentials.user_id(),
                company_id: credentials.client_id(),
                user_type: "admin",
                resource_type: "learning_public_api",
            },
            client_id: credentials.client_id(),
            client_secret: credentials.client_secret(),
        }
    }
}

/// The parts of the token response we read.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges the client credentials for a bearer token.
///
/// This performs exactly one round trip and has no side effects; storing
/// the token is up to the caller.
pub async fn request_token(
    client: &reqwest::Client,
    credentials: &Credentials,
) -> Result<Token, AuthError> {
    let token_url = format!("{}{}", credentials.base_url(), TOKEN_ENDPOINT_PATH);

    // We must specify we're POSTing JSON.
    let result = client
        .post(&token_url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&TokenRequest::new(credentials))
        .send()
        .await
        .map_err(AuthError::transport)?;

    // We read the body before checking the status, as it explains a rejection.
    let status = result.status();
    let response_text = result.text().await.map_err(AuthError::transport)?;

    // Anything but 200 is a rejection. A proxy in front of the tenant may
    // answer with a whole HTML page, so we only keep the start of it.
    if status != StatusCode::OK {
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body: truncate_body(response_text),
        });
    }

    let response: TokenResponse = serde_json::from_str(&response_text)
        .map_err(|error| AuthError::Decode(error.to_string()))?;

    // We only log the server's view of the lifetime; see `TOKEN_LIFETIME`.
    if let Some(expires_in) = response.expires_in {
        tracing::debug!(expires_in, "Token endpoint reported a lifetime");
    }

    Ok(Token::issue(response.access_token, Utc::now()))
}
