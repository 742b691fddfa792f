//! Token exchange cache.
//!
//! Exchanges a caller's identity assertion for a backend session token.
//! The cache key is a SHA-256 hash of the assertion -- the raw credential
//! is never stored -- and concurrent misses for the same assertion coalesce
//! into a single backend exchange.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use timecard_core::{Error, Result};

use crate::executor::ApiClient;

const MAX_ASSERTION_LEN: usize = 4096;

const EXCHANGE_PATH: &str = "core/google-login/";

#[derive(Clone)]
struct CacheEntry {
    token: String,
    email: String,
    seq: u64,
    expires_at: Instant,
}

/// Bounded, TTL-expiring map of assertion-hash → session credentials.
/// Expired entries are evicted first when full, then the oldest insertion.
struct TokenCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
    next_seq: std::sync::atomic::AtomicU64,
}

impl TokenCache {
    fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            ttl,
            next_seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn get(&self, key: &str) -> Option<(String, String)> {
        let entry = self.entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some((entry.token.clone(), entry.email.clone()))
    }

    fn put(&self, key: String, token: String, email: String) {
        let now = Instant::now();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict(now);
        }
        let seq = self
            .next_seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.entries.insert(
            key,
            CacheEntry {
                token,
                email,
                seq,
                expires_at: now + self.ttl,
            },
        );
    }

    fn evict(&self, now: Instant) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| e.key().clone())
            .collect();
        if !expired.is_empty() {
            for key in expired {
                self.entries.remove(&key);
            }
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().seq)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves identity assertions to `(session_token, email)` pairs.
pub struct TokenExchanger {
    cache: TokenCache,
    allowed_domain: String,
    /// Per-key locks coalescing concurrent exchanges for the same assertion.
    in_flight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl TokenExchanger {
    pub fn new(allowed_domain: &str, cache_size: usize, cache_ttl: Duration) -> Result<Self> {
        let allowed_domain = allowed_domain.trim().to_lowercase();
        if allowed_domain.is_empty() {
            return Err(Error::InvalidArgument(
                "allowed_domain must not be empty".into(),
            ));
        }
        Ok(Self {
            cache: TokenCache::new(cache_size, cache_ttl),
            allowed_domain,
            in_flight: DashMap::new(),
        })
    }

    /// Resolve an identity assertion to `(session_token, email)`.
    ///
    /// Cache hits return without a backend call. On a miss, the backend
    /// exchange runs under a per-key lock so concurrent callers with the
    /// same assertion share one round-trip.
    pub async fn resolve(&self, api: &ApiClient, assertion: &str) -> Result<(String, String)> {
        let assertion = assertion.trim();
        if assertion.is_empty() {
            return Err(Error::InvalidArgument(
                "identity assertion must not be empty".into(),
            ));
        }
        if assertion.len() > MAX_ASSERTION_LEN {
            return Err(Error::InvalidArgument(format!(
                "identity assertion exceeds maximum length ({MAX_ASSERTION_LEN})"
            )));
        }

        let key = hex_digest(assertion);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            // Another caller may have finished the exchange while we waited.
            match self.cache.get(&key) {
                Some(hit) => Ok(hit),
                None => self.exchange(api, assertion, &key).await,
            }
        };
        // Drop the coalescing lock once no other caller holds it.
        self.in_flight
            .remove_if(&key, |_, lock| Arc::strong_count(lock) <= 2);
        result
    }

    async fn exchange(
        &self,
        api: &ApiClient,
        assertion: &str,
        key: &str,
    ) -> Result<(String, String)> {
        let body = json!({ "platform": "google", "access_token": assertion });
        let data = api.post_unauthenticated(EXCHANGE_PATH, &body).await?;

        let token = data.get("token").and_then(Value::as_str).unwrap_or("");
        let email = data.get("email").and_then(Value::as_str).unwrap_or("");
        if token.is_empty() {
            return Err(Error::backend(
                "token exchange response did not include a session token",
                None,
            ));
        }
        if email.is_empty() {
            return Err(Error::backend(
                "token exchange response did not include an email",
                None,
            ));
        }
        if !valid_token_format(token) {
            return Err(Error::backend(
                format!(
                    "token exchange returned a malformed session token (length={})",
                    token.len()
                ),
                None,
            ));
        }

        // Domain restriction: checked before anything reaches the cache.
        let Some((_, domain)) = email.rsplit_once('@') else {
            return Err(Error::backend(
                "token exchange returned an email without '@'",
                None,
            ));
        };
        if domain.trim().to_lowercase() != self.allowed_domain {
            return Err(Error::AuthorizationDenied(format!(
                "only @{} accounts may authenticate",
                self.allowed_domain
            )));
        }

        self.cache
            .put(key.to_string(), token.to_string(), email.to_string());
        Ok((token.to_string(), email.to_string()))
    }

    /// Number of cached credentials (expired entries included until touched
    /// or evicted).
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

fn valid_token_format(token: &str) -> bool {
    (10..=512).contains(&token.len())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn hex_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
