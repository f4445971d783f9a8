//! Connection settings for a learning API tenant.
//!
//! Values are normally sourced from the environment:
//!
//! | Variable           | Required | Default   | Description                               |
//! |--------------------|----------|-----------|-------------------------------------------|
//! | `SF_CLIENT_ID`     | yes      | --        | OAuth client id, also sent as `companyId` |
//! | `SF_CLIENT_SECRET` | yes      | --        | OAuth client secret                       |
//! | `SF_USER_ID`       | yes      | --        | Admin user the token is scoped to         |
//! | `SF_BASE_URL`      | yes      | --        | Tenant URL, e.g. `https://acme.plateau.com` |
//! | `SF_ENVIRONMENT`   | no       | `sandbox` | `sandbox` or `production`, anything else is an error |
//! | `SF_TIMEOUT_SECS`  | no       | `10`      | Timeout applied to every HTTP call        |
//! | `SF_CACHE_SECS`    | no       | `300`     | How long a cached response stays fresh    |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Timeout applied to both the token exchange and data requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a successful response may be served from the cache.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(300);

/// The four values needed to talk to a tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    user_id: String,
    base_url: String,
}

impl Credentials {
    /// Validates `base_url` and strips any trailing slash so endpoint paths
    /// can be appended directly.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_id: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_id: user_id.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Self::new(
            required("SF_CLIENT_ID")?,
            required("SF_CLIENT_SECRET")?,
            required("SF_USER_ID")?,
            &required("SF_BASE_URL")?,
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The tenant URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// The secret must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"**********")
            .field("user_id", &self.user_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Tunables shared by every request a client makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub cache_duration: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cache_duration: DEFAULT_CACHE_DURATION,
        }
    }
}

impl ClientSettings {
    /// Reads overrides from the environment, keeping defaults for unset values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let seconds = |name: &'static str, default: Duration| match lookup(name) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber { name, value }),
            None => Ok(default),
        };

        Ok(Self {
            timeout: seconds("SF_TIMEOUT_SECS", DEFAULT_TIMEOUT)?,
            cache_duration: seconds("SF_CACHE_SECS", DEFAULT_CACHE_DURATION)?,
        })
    }
}

/// Which tenant the credentials belong to. Only used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Reads `SF_ENVIRONMENT`, defaulting to the sandbox when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup("SF_ENVIRONMENT") {
            Some(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    // Anything unrecognised is an error, never a fallback to the sandbox.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "sandbox" => Ok(Self::Sandbox),
            _ => Err(ConfigError::UnknownEnvironment(value.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => f.write_str("SANDBOX"),
            Self::Production => f.write_str("PRODUCTION"),
        }
    }
}
