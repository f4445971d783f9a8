use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// How long an issued token is treated as valid.
///
/// The `expires_in` reported by the token endpoint is ignored. A tenant
/// issuing shorter-lived tokens will answer 401 before this lifetime ends.
pub const TOKEN_LIFETIME: Duration = Duration::seconds(3600);

/// A bearer token returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    access_token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Wraps an access token issued at `issued_at`.
    ///
    /// Also used to resume a session with a token obtained earlier.
    pub fn issue(access_token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at,
            expires_at: issued_at + TOKEN_LIFETIME,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// A token is usable up to and including its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before expiry, clamped at zero.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

// Only a prefix of the token is shown, which is enough to tell tokens apart.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.access_token.chars().take(8).collect();
        f.debug_struct("Token")
            .field("access_token", &format_args!("{prefix}..."))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_one_hour_after_issue() {
        let issued_at = Utc::now();
        let token = Token::issue("abc", issued_at);

        assert_eq!(token.expires_at() - token.issued_at(), Duration::seconds(3600));
        assert!(!token.is_expired_at(issued_at));
        assert!(!token.is_expired_at(token.expires_at()));
        assert!(token.is_expired_at(token.expires_at() + Duration::milliseconds(1)));
    }

    #[test]
    fn remaining_time_never_negative() {
        let issued_at = Utc::now() - Duration::hours(2);
        let token = Token::issue("abc", issued_at);

        assert!(token.is_expired());
        assert_eq!(token.remaining_at(Utc::now()), Duration::zero());

        let fresh = Token::issue("def", issued_at + Duration::hours(2));
        assert_eq!(
            fresh.remaining_at(issued_at + Duration::hours(2) + Duration::minutes(15)),
            Duration::minutes(45)
        );
    }

    #[test]
    fn debug_shows_prefix_only() {
        let token = Token::issue("eyJhbGciOiJSUzI1NiJ9.payload.signature", Utc::now());
        let rendered = format!("{token:?}");

        assert!(rendered.contains("eyJhbGci..."));
        assert!(!rendered.contains("signature"));
    }
}
