//! Self-refreshing cache for ERNIE access tokens.
//!
//! Wenxin Workshop authenticates every call with a short-lived bearer token
//! obtained by exchanging a `client_id|client_secret` pair at Baidu's OAuth
//! endpoint. The cache keeps one token per credential key in memory, serves
//! reads without blocking on refreshes, and re-fetches in the background
//! once a token gets within an hour of expiry. Nothing is persisted; a
//! restart starts cold.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::{RelayError, Result};

pub const DEFAULT_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Lead time before expiry at which a token is refreshed in the background.
const REFRESH_MARGIN: Duration = Duration::from_secs(60 * 60);

/// The exchange gets its own short deadline, separate from the relay
/// client's; a slow token endpoint must not tie up a request for long.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Keyed token store shared across in-flight requests. Cloning is cheap;
/// clones share the same underlying cache.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    token_url: String,
    tokens: RwLock<HashMap<String, CachedToken>>,
    /// Per-key guards so one credential exchange is in flight per key at
    /// most, whether synchronous or background.
    fetch_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenCache {
    pub fn new(token_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                token_url: token_url.into(),
                tokens: RwLock::new(HashMap::new()),
                fetch_locks: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Return a bearer token for `key`, fetching or refreshing as needed.
    ///
    /// A cached token still comfortably inside its lifetime is returned
    /// as-is. One within [`REFRESH_MARGIN`] of expiry is returned unchanged
    /// while a background refresh replaces it for later callers. A missing
    /// or fully expired token is exchanged synchronously; concurrent
    /// callers for the same key share a single exchange.
    pub async fn get_token(&self, key: &str) -> Result<String> {
        let now = Instant::now();

        if let Some(cached) = self.lookup(key).await {
            if cached.expires_at > now {
                if cached.expires_at <= now + REFRESH_MARGIN {
                    self.spawn_refresh(key);
                }
                return Ok(cached.access_token);
            }
        }

        let guard = self.fetch_guard(key).await;
        let _locked = guard.lock().await;

        // Someone else may have filled the slot while we waited.
        if let Some(cached) = self.lookup(key).await {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token);
            }
        }

        let token = self.exchange(key).await?;
        Ok(token.access_token)
    }

    async fn lookup(&self, key: &str) -> Option<CachedToken> {
        self.inner.tokens.read().await.get(key).cloned()
    }

    async fn fetch_guard(&self, key: &str) -> Arc<Mutex<()>> {
        self.inner
            .fetch_locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Best-effort background refresh: failures are logged and dropped,
    /// the stale-but-valid token keeps serving until the next attempt.
    fn spawn_refresh(&self, key: &str) {
        let cache = self.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            let guard = cache.fetch_guard(&key).await;
            let Ok(_locked) = guard.try_lock() else {
                return; // an exchange for this key is already running
            };
            if let Err(e) = cache.exchange(&key).await {
                warn!(key = %redact(&key), error = %e, "background token refresh failed");
            }
        });
    }

    async fn exchange(&self, key: &str) -> Result<CachedToken> {
        let (client_id, client_secret) = split_credential(key)?;

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send()
            .await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RelayError::decode(format!("token endpoint response: {e}")))?;

        if !token.error.is_empty() {
            return Err(RelayError::credential(format!(
                "{}: {}",
                token.error, token.error_description
            )));
        }
        if token.access_token.is_empty() {
            return Err(RelayError::credential(
                "token endpoint returned an empty access token",
            ));
        }

        let cached = CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };

        // Whole-value insert: readers see the old token or the new one,
        // never a half-written entry.
        self.inner
            .tokens
            .write()
            .await
            .insert(key.to_string(), cached.clone());

        Ok(cached)
    }
}

/// Split a composite credential key into its two halves. Fails fast, with
/// no network traffic, on anything but exactly two non-empty parts.
fn split_credential(key: &str) -> Result<(&str, &str)> {
    match key.split_once('|') {
        Some((id, secret)) if !id.is_empty() && !secret.is_empty() && !secret.contains('|') => {
            Ok((id, secret))
        }
        _ => Err(RelayError::credential(
            "credential key must be client_id|client_secret",
        )),
    }
}

/// Credential keys carry the client secret; only a short prefix may appear
/// in logs.
fn redact(key: &str) -> String {
    let prefix: String = key.chars().take(6).collect();
    format!("{prefix}***")
}
