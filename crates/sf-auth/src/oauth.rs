//! OAuth 2.0 token endpoint client.
//!
//! Every grant posts a form to `{login_url}/services/oauth2/token` and reads
//! back a [`TokenResponse`]. Secrets never appear in spans or `Debug` output.

use serde::{Deserialize, Serialize};
use sfkit_client::AccessToken;
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};

const TOKEN_PATH: &str = "/services/oauth2/token";

/// OAuth 2.0 configuration for a connected app.
///
/// `consumer_secret` is redacted in Debug output.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Consumer key (client_id).
    pub consumer_key: String,
    consumer_secret: Option<String>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

impl OAuthConfig {
    pub fn new(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.consumer_secret = Some(secret.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub(crate) fn consumer_secret(&self) -> Option<&str> {
        self.consumer_secret.as_deref()
    }
}

/// Client for the Salesforce token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Username-password grant. `password` must already include the
    /// security token when the org requires one.
    #[instrument(skip(self, password))]
    pub async fn password_grant(
        &self,
        login_url: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        self.push_client_credentials(&mut params);
        self.post_form(login_url, &params).await
    }

    /// Refresh an access token.
    ///
    /// The refresh_token parameter is not logged to prevent credential exposure.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_token(&self, login_url: &str, refresh_token: &str) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.push_client_credentials(&mut params);
        self.post_form(login_url, &params).await
    }

    /// Exchange a signed JWT assertion for an access token.
    #[instrument(skip(self, assertion))]
    pub async fn jwt_bearer(&self, login_url: &str, assertion: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion),
        ];
        self.post_form(login_url, &params).await
    }

    fn push_client_credentials<'a>(&'a self, params: &mut Vec<(&'a str, &'a str)>) {
        params.push(("client_id", &self.config.consumer_key));
        if let Some(secret) = self.config.consumer_secret() {
            params.push(("client_secret", secret));
        }
    }

    async fn post_form(&self, login_url: &str, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let body = serde_urlencoded::to_string(params)?;
        let url = format!("{}{}", login_url.trim_end_matches('/'), TOKEN_PATH);
        debug!(url = %url, "requesting access token");

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error = response
                .json::<OAuthErrorResponse>()
                .await
                .unwrap_or_else(|_| OAuthErrorResponse {
                    error: format!("http_{status}"),
                    error_description: "token endpoint returned an unreadable error".to_string(),
                });
            return Err(Error::new(ErrorKind::OAuth {
                error: error.error,
                description: error.error_description,
            }));
        }

        Ok(response.json().await?)
    }
}

/// Token response from the token endpoint.
///
/// `access_token`, `refresh_token` and `signature` are redacted in Debug
/// output.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub instance_url: String,
    /// Identity URL of the user.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("instance_url", &self.instance_url)
            .field("id", &self.id)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl TokenResponse {
    /// The bearer token, without an expiry: Salesforce does not report one.
    pub fn to_access_token(&self) -> AccessToken {
        AccessToken::bearer(&self.access_token)
            .with_token_type(self.token_type.as_deref().unwrap_or("Bearer"))
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}
