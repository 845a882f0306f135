//! Static credentials for an already authenticated session.

use futures::future::BoxFuture;
use sfkit_client::{AccessToken, ClientConfig, SalesforceClient, TokenSource};

use crate::error::{Error, ErrorKind, Result};
use crate::flows::RefreshTokenFlow;
use crate::oauth::{OAuthClient, OAuthConfig};

/// Instance URL and access token of an existing session.
///
/// Tokens are redacted in Debug output.
#[derive(Clone)]
pub struct SalesforceCredentials {
    instance_url: String,
    access_token: String,
    api_version: String,
    refresh_token: Option<String>,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl SalesforceCredentials {
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Load credentials from environment variables.
    ///
    /// Required environment variables:
    /// - `SF_INSTANCE_URL` or `SALESFORCE_INSTANCE_URL`
    /// - `SF_ACCESS_TOKEN` or `SALESFORCE_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `SF_API_VERSION` or `SALESFORCE_API_VERSION` (default: "62.0")
    /// - `SF_REFRESH_TOKEN` or `SALESFORCE_REFRESH_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(&format!("SF_{name}"))
                .or_else(|| lookup(&format!("SALESFORCE_{name}")))
                .filter(|value| !value.is_empty())
        };

        let instance_url = var("INSTANCE_URL")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_INSTANCE_URL".to_string())))?;
        let access_token = var("ACCESS_TOKEN")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_ACCESS_TOKEN".to_string())))?;
        let api_version =
            var("API_VERSION").unwrap_or_else(|| sfkit_client::DEFAULT_API_VERSION.to_string());

        let mut creds = Self::new(instance_url, access_token, api_version);
        if let Some(rt) = var("REFRESH_TOKEN") {
            creds = creds.with_refresh_token(rt);
        }
        Ok(creds)
    }

    /// A token source that renews the session through the refresh token.
    pub fn refresh_flow(&self, oauth: OAuthConfig, login_url: &str) -> Result<RefreshTokenFlow> {
        let refresh_token = self.refresh_token.as_deref().ok_or_else(|| {
            Error::new(ErrorKind::InvalidCredentials(
                "no refresh token available".to_string(),
            ))
        })?;
        Ok(RefreshTokenFlow::new(
            OAuthClient::new(oauth),
            login_url,
            refresh_token,
        ))
    }

    /// A transport for this session's instance and API version.
    pub fn client(&self, config: ClientConfig) -> sfkit_client::Result<SalesforceClient> {
        Ok(
            SalesforceClient::with_token_source(&self.instance_url, self.clone(), config)?
                .with_api_version(&self.api_version),
        )
    }
}

impl TokenSource for SalesforceCredentials {
    fn token(&self) -> BoxFuture<'_, sfkit_client::Result<AccessToken>> {
        let token = AccessToken::bearer(&self.access_token);
        Box::pin(async move { Ok(token) })
    }
}
