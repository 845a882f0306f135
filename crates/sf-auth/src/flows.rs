//! OAuth grants exposed as token sources.

use std::path::Path;

use futures::future::BoxFuture;
use serde::Deserialize;
use sfkit_client::{AccessToken, ClientConfig, SalesforceClient, TokenSource};
use tracing::instrument;

use crate::cache::CachingTokenSource;
use crate::error::{Error, ErrorKind, Result};
use crate::oauth::{OAuthClient, OAuthConfig};

/// Default Salesforce login URL for production.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Default Salesforce login URL for sandbox.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";

pub(crate) fn login_url(sandbox: bool) -> &'static str {
    if sandbox {
        SANDBOX_LOGIN_URL
    } else {
        PRODUCTION_LOGIN_URL
    }
}

/// Prefix bare host names with `https://`.
pub(crate) fn instance_url(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

/// Settings for the username-password flow, loadable from JSON.
///
/// ```json
/// {
///   "host": "myorg.my.salesforce.com",
///   "api_version": "62.0",
///   "client_id": "3MVG9...",
///   "client_secret": "...",
///   "username": "user@example.com",
///   "password": "...",
///   "security_token": "...",
///   "sandbox": false
/// }
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub host: String,
    pub api_version: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub security_token: String,
    pub sandbox: bool,
}

impl std::fmt::Debug for PasswordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordConfig")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl PasswordConfig {
    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("host", &self.host),
            ("client_id", &self.client_id),
            ("username", &self.username),
        ] {
            if value.is_empty() {
                return Err(Error::new(ErrorKind::Config(format!(
                    "{name} may not be empty"
                ))));
            }
        }
        Ok(())
    }

    /// Token source for this configuration.
    pub fn flow(&self) -> Result<PasswordFlow> {
        self.validate()?;
        let oauth = OAuthConfig::new(&self.client_id).with_secret(&self.client_secret);
        Ok(PasswordFlow {
            oauth: OAuthClient::new(oauth),
            login_url: login_url(self.sandbox).to_string(),
            username: self.username.clone(),
            password: format!("{}{}", self.password, self.security_token),
        })
    }

    /// A transport for `host` that logs in once and reuses the token.
    pub fn client(&self, config: ClientConfig) -> Result<SalesforceClient> {
        let source = CachingTokenSource::new(self.flow()?);
        let version = if self.api_version.is_empty() {
            sfkit_client::DEFAULT_API_VERSION
        } else {
            &self.api_version
        };
        let client = SalesforceClient::with_token_source(instance_url(&self.host), source, config)
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;
        Ok(client.with_api_version(version))
    }
}

/// Username-password OAuth grant.
///
/// The security token, if any, is already appended to the password.
#[derive(Clone)]
pub struct PasswordFlow {
    oauth: OAuthClient,
    login_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for PasswordFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordFlow")
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl PasswordFlow {
    pub fn new(
        oauth: OAuthClient,
        login_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            oauth,
            login_url: login_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[instrument(skip(self), fields(username = %self.username))]
    async fn fetch(&self) -> sfkit_client::Result<AccessToken> {
        let response = self
            .oauth
            .password_grant(&self.login_url, &self.username, &self.password)
            .await?;
        Ok(response.to_access_token())
    }
}

impl TokenSource for PasswordFlow {
    fn token(&self) -> BoxFuture<'_, sfkit_client::Result<AccessToken>> {
        Box::pin(self.fetch())
    }
}

/// Refresh-token OAuth grant.
#[derive(Clone)]
pub struct RefreshTokenFlow {
    oauth: OAuthClient,
    login_url: String,
    refresh_token: String,
}

impl std::fmt::Debug for RefreshTokenFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenFlow")
            .field("login_url", &self.login_url)
            .field("refresh_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RefreshTokenFlow {
    pub fn new(
        oauth: OAuthClient,
        login_url: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            oauth,
            login_url: login_url.into(),
            refresh_token: refresh_token.into(),
        }
    }

    async fn fetch(&self) -> sfkit_client::Result<AccessToken> {
        let response = self
            .oauth
            .refresh_token(&self.login_url, &self.refresh_token)
            .await?;
        Ok(response.to_access_token())
    }
}

impl TokenSource for RefreshTokenFlow {
    fn token(&self) -> BoxFuture<'_, sfkit_client::Result<AccessToken>> {
        Box::pin(self.fetch())
    }
}
