//! Token reuse and persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sfkit_client::{AccessToken, TokenSource};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Lifetime, in hours, assumed for tokens issued without an expiry.
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 4;

/// Persistent storage for a single access token.
pub trait TokenCache: Send + Sync {
    /// Load the stored token, if any.
    fn load(&self) -> Result<Option<AccessToken>>;

    /// Replace the stored token.
    fn save(&self, token: &AccessToken) -> Result<()>;

    /// Remove the stored token.
    fn clear(&self) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    token_type: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Keeps the token as JSON in one file.
///
/// On Unix the file is readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenCache for FileTokenCache {
    fn load(&self) -> Result<Option<AccessToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path).map_err(|e| Error::cache(&self.path, e))?;
        let stored: StoredToken =
            serde_json::from_str(&json).map_err(|e| Error::cache(&self.path, e))?;

        let mut token = AccessToken::bearer(stored.access_token).with_token_type(stored.token_type);
        if let Some(at) = stored.expires_at {
            token = token.with_expiry(at);
        }
        Ok(Some(token))
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| Error::cache(dir, e))?;
        }

        let stored = StoredToken {
            access_token: token.secret().to_string(),
            token_type: token.token_type().to_string(),
            expires_at: token.expires_at(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, json).map_err(|e| Error::cache(&self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(|e| Error::cache(&self.path, e))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| Error::cache(&self.path, e))?;
        }
        Ok(())
    }
}

/// Wraps a token source and hands out the same token until it expires.
///
/// Tokens without an expiry are stamped with the configured lifetime. When a
/// [`TokenCache`] is attached, a still valid stored token is used before the
/// inner source is asked, and every fresh token is written back. Cache
/// failures are logged and never fail the call.
pub struct CachingTokenSource<S> {
    inner: S,
    cache: Option<Box<dyn TokenCache>>,
    lifetime: Duration,
    current: Mutex<Option<AccessToken>>,
}

impl<S> std::fmt::Debug for CachingTokenSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingTokenSource")
            .field("cached", &self.cache.is_some())
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl<S: TokenSource> CachingTokenSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: None,
            lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
            current: Mutex::new(None),
        }
    }

    pub fn with_cache(self, cache: impl TokenCache + 'static) -> Self {
        self.with_boxed_cache(Box::new(cache))
    }

    pub fn with_boxed_cache(mut self, cache: Box<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Lifetime applied to tokens the issuer returns without an expiry.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Forget the held token and the stored one.
    pub async fn invalidate(&self) -> Result<()> {
        *self.current.lock().await = None;
        match &self.cache {
            Some(cache) => cache.clear(),
            None => Ok(()),
        }
    }

    async fn fetch(&self) -> sfkit_client::Result<AccessToken> {
        let mut current = self.current.lock().await;
        let now = Utc::now();

        if let Some(token) = current.as_ref().filter(|t| !t.is_expired(now)) {
            return Ok(token.clone());
        }

        if let Some(cache) = &self.cache {
            match cache.load() {
                Ok(Some(token)) if !token.is_expired(now) => {
                    debug!("using stored access token");
                    *current = Some(token.clone());
                    return Ok(token);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to load stored token"),
            }
        }

        let mut token = self.inner.token().await?;
        if token.expires_at().is_none() {
            token = token.with_expiry(now + self.lifetime);
        }
        debug!(expires_at = ?token.expires_at(), "obtained new access token");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(&token) {
                warn!(error = %e, "failed to store access token");
            }
        }

        *current = Some(token.clone());
        Ok(token)
    }
}

impl<S: TokenSource> TokenSource for CachingTokenSource<S> {
    fn token(&self) -> BoxFuture<'_, sfkit_client::Result<AccessToken>> {
        Box::pin(self.fetch())
    }
}
