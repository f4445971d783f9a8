use std::fmt;

/// Longest response body carried inside an error, in characters.
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Problems with the connection settings, detected before any request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL must use http or https, not {0:?}")]
    UnsupportedScheme(String),

    #[error("SF_ENVIRONMENT must be sandbox or production, got {0:?}")]
    UnknownEnvironment(String),

    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Network-level failure classes, so callers can decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Other,
}

impl TransportKind {
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connect => f.write_str("connection error"),
            Self::Other => f.write_str("transport error"),
        }
    }
}

/// Failures of the token exchange.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered with something other than 200.
    #[error("authentication failed ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("authentication request failed ({kind}): {source}")]
    Transport {
        kind: TransportKind,
        #[source]
        source: reqwest::Error,
    },

    /// A 200 response without a usable `access_token`.
    #[error("token response could not be decoded: {0}")]
    Decode(String),
}

impl AuthError {
    pub(crate) fn transport(source: reqwest::Error) -> Self {
        Self::Transport {
            kind: TransportKind::classify(&source),
            source,
        }
    }

    /// HTTP status of a rejected token request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures of a data request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// No usable token could be obtained; the data request was not sent.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The data endpoint answered with something other than 200.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed ({kind}): {source}")]
    Transport {
        endpoint: String,
        kind: TransportKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned a body that is not valid JSON: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RequestError {
    pub(crate) fn transport(endpoint: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            kind: TransportKind::classify(&source),
            source,
        }
    }

    /// Network failures, including those hit while authenticating.
    /// Nothing was mutated, so retrying is always safe.
    pub fn is_transient(&self) -> bool {
        self.transport_kind().is_some()
    }

    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            Self::Transport { kind, .. } | Self::Auth(AuthError::Transport { kind, .. }) => {
                Some(*kind)
            }
            _ => None,
        }
    }

    /// HTTP status of a non-200 answer from either endpoint.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Auth(error) => error.status(),
            _ => None,
        }
    }
}

/// Cuts a response body down to [`MAX_ERROR_BODY_CHARS`] on a char boundary.
pub(crate) fn truncate_body(mut body: String) -> String {
    if let Some((index, _)) = body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        body.truncate(index);
        body.push_str("...");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_are_untouched() {
        assert_eq!(truncate_body("not found".to_string()), "not found");
    }

    #[test]
    fn long_bodies_are_cut_on_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY_CHARS + 20);
        let truncated = truncate_body(body);

        assert_eq!(truncated.chars().count(), MAX_ERROR_BODY_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn rejected_auth_reports_status_through_request_error() {
        let error = RequestError::from(AuthError::Rejected {
            status: 401,
            body: "invalid_client".to_string(),
        });

        assert_eq!(error.status(), Some(401));
        assert!(!error.is_transient());
        assert_eq!(
            error.to_string(),
            "authentication failed (401): invalid_client"
        );
    }
}
