//! Bearer token supply.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::Result;

/// An OAuth access token.
///
/// The token value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// A bearer token with no known expiry.
    pub fn bearer(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    /// Set the expiry instant.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Override the token type reported by the issuer.
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// The raw token value. Do not log it.
    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True once `now` is past the expiry. Tokens without expiry never
    /// expire locally; the server still rejects them with 401.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Supplies the bearer token for each outgoing call.
///
/// Implementations decide how tokens are obtained and refreshed. The
/// transport asks once per call, so caching belongs in the source.
pub trait TokenSource: Send + Sync {
    /// Return a token valid for the next call.
    fn token(&self) -> BoxFuture<'_, Result<AccessToken>>;
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken>> {
        (**self).token()
    }
}

/// A fixed token, e.g. one obtained out of band.
#[derive(Debug, Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(AccessToken::bearer(value))
    }
}

impl From<AccessToken> for StaticToken {
    fn from(token: AccessToken) -> Self {
        Self(token)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}
