//! Access-token lifecycle.
//!
//! The long-lived secret is exchanged for a short-lived bearer token which is
//! cached in memory and on disk. All access goes through one async mutex so a
//! burst of concurrent 401s triggers a single exchange.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::models::{AccessTokenRequest, AccessTokenResponse};
use crate::secrets::{SecretStore, SECRET_KEY, SERVICE};
use crate::transport::{HttpRequest, HttpTransport};

pub const SECRET_ENV: &str = "BROKERTERM_SECRET";
pub const TOKEN_PATH: &str = "/userapiauthservice/personal/access-tokens";

/// Tokens closer than this to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Where the current token survives restarts.
pub trait TokenCache: Send + Sync {
    fn load(&self) -> Option<CachedToken>;
    fn store(&self, token: &CachedToken) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenCache for FileTokenCache {
    fn load(&self) -> Option<CachedToken> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!(target: "auth", "ignoring unreadable token cache {}: {e}", self.path.display());
                None
            }
        }
    }

    fn store(&self, token: &CachedToken) -> Result<(), ApiError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| ApiError::Config(e.to_string()))?;
        }
        let json = serde_json::to_vec_pretty(token).map_err(|e| ApiError::Config(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| ApiError::Config(format!("write {}: {e}", self.path.display())))
    }
}

#[derive(Default)]
struct Slot {
    loaded: bool,
    token: Option<CachedToken>,
}

pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    secrets: Arc<dyn SecretStore>,
    cache: Arc<dyn TokenCache>,
    validity_minutes: u32,
    slot: Mutex<Slot>,
}

impl TokenManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        secrets: Arc<dyn SecretStore>,
        cache: Arc<dyn TokenCache>,
        validity_minutes: u32,
    ) -> Self {
        Self {
            transport,
            secrets,
            cache,
            validity_minutes: validity_minutes.max(1),
            slot: Mutex::new(Slot::default()),
        }
    }

    /// A token valid for at least the expiry margin, exchanging the secret
    /// when the cached one is missing or about to expire.
    pub async fn current_token(&self) -> Result<String, ApiError> {
        let mut slot = self.slot.lock().await;
        if !slot.loaded {
            slot.token = self.cache.load();
            slot.loaded = true;
        }
        if let Some(token) = slot.token.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token.clone());
        }
        let token = self.exchange().await?;
        let access = token.access_token.clone();
        slot.token = Some(token);
        Ok(access)
    }

    /// Replaces `stale` after the server rejected it. If another caller has
    /// already refreshed, the newer token is returned without an exchange.
    pub async fn force_refresh(&self, stale: &str) -> Result<String, ApiError> {
        let mut slot = self.slot.lock().await;
        slot.loaded = true;
        if let Some(current) = slot.token.as_ref() {
            if current.access_token != stale {
                log::debug!(target: "auth", "token already refreshed by another request");
                return Ok(current.access_token.clone());
            }
        }
        let token = self.exchange().await?;
        let access = token.access_token.clone();
        slot.token = Some(token);
        Ok(access)
    }

    fn secret(&self) -> Result<String, ApiError> {
        if let Ok(value) = std::env::var(SECRET_ENV) {
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
        }
        self.secrets.get(SERVICE, SECRET_KEY)?.ok_or_else(|| {
            ApiError::Config(format!(
                "no API secret configured; run `brokerterm set-secret` or set {SECRET_ENV}"
            ))
        })
    }

    async fn exchange(&self) -> Result<CachedToken, ApiError> {
        let secret = self.secret()?;
        let body = AccessTokenRequest {
            secret,
            validity_in_minutes: self.validity_minutes,
        };
        let request = HttpRequest::post(TOKEN_PATH, &body)?;
        let issued_at = Utc::now();
        let resp = self.transport.execute(&request, None).await?;
        if !resp.is_success() {
            log::warn!(target: "auth", "token exchange rejected with HTTP {}", resp.status);
            return Err(ApiError::from_status(resp.status, &resp.bytes));
        }
        let parsed: AccessTokenResponse =
            serde_json::from_slice(&resp.bytes).map_err(|e| ApiError::Decode(e.to_string()))?;
        let token = CachedToken {
            access_token: parsed.access_token,
            expires_at: issued_at + Duration::minutes(i64::from(self.validity_minutes)),
        };
        if let Err(e) = self.cache.store(&token) {
            log::warn!(target: "auth", "could not persist token: {e}");
        }
        log::info!(target: "auth", "access token refreshed, valid until {}", token.expires_at);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_respects_margin() {
        let now = Utc::now();
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: now + Duration::seconds(31),
        };
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(1)));
    }

    #[test]
    fn file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path().join("token.json"));
        assert!(cache.load().is_none());
        let token = CachedToken {
            access_token: "abc".into(),
            expires_at: Utc::now(),
        };
        cache.store(&token).unwrap();
        assert_eq!(cache.load(), Some(token));

        fs::write(dir.path().join("token.json"), b"not json").unwrap();
        assert!(cache.load().is_none());
    }
}
