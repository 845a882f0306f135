//! # sfkit-auth
//!
//! Token sources for the sfkit transport.
//!
//! ## Security
//!
//! - Sensitive data (tokens, secrets, keys) are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages sanitize any credential data
//!
//! ## Supported Authentication Methods
//!
//! - **Static session** - [`SalesforceCredentials`], from values or the environment
//! - **Username-password** - [`PasswordFlow`], configured by [`PasswordConfig`]
//! - **Refresh token** - [`RefreshTokenFlow`]
//! - **JWT Bearer** - [`JwtAuth`], configured by [`JwtConfig`]
//!
//! [`CachingTokenSource`] wraps any of them to reuse a token until it
//! expires, optionally persisting it through a [`TokenCache`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_auth::{CachingTokenSource, FileTokenCache, JwtAuth};
//! use sfkit_client::{ClientConfig, SalesforceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::fs::read("path/to/key.pem")?;
//!     let jwt = JwtAuth::new("consumer_key", "user@example.com", &key)?;
//!     let tokens = CachingTokenSource::new(jwt).with_cache(FileTokenCache::new("token.json"));
//!
//!     let client = SalesforceClient::with_token_source(
//!         "https://myorg.my.salesforce.com",
//!         tokens,
//!         ClientConfig::default(),
//!     )?;
//!     Ok(())
//! }
//! ```

mod cache;
mod credentials;
mod error;
mod flows;
mod jwt;
mod oauth;

pub use cache::{CachingTokenSource, FileTokenCache, TokenCache, DEFAULT_TOKEN_LIFETIME_HOURS};
pub use credentials::SalesforceCredentials;
pub use error::{Error, ErrorKind, Result};
pub use flows::{
    PasswordConfig, PasswordFlow, RefreshTokenFlow, PRODUCTION_LOGIN_URL, SANDBOX_LOGIN_URL,
};
pub use jwt::{JwtAuth, JwtConfig};
pub use oauth::{OAuthClient, OAuthConfig, TokenResponse};
