//! Single-use challenge/response wallet authentication.
//!
//! A wallet requests a nonce, signs the canonical message binding its
//! address to that nonce, and presents the signature. Verification is a
//! uniform boolean; no detail about which sub-check failed is disclosed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::wallet;

pub const NONCE_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: String,
    pub expires_at_ms: i64,
}

/// Keyed challenge storage. The in-memory store below serializes access
/// with one lock; an external backing store must provide the same
/// atomicity for `remove_if_matches`, which is what makes a nonce
/// single-use under concurrent verification.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn get(&self, address: &str) -> Option<Challenge>;
    async fn put(&self, address: &str, challenge: Challenge);
    async fn remove(&self, address: &str);
    /// Deletes the stored challenge only if its nonce matches; returns
    /// whether this caller performed the deletion.
    async fn remove_if_matches(&self, address: &str, nonce: &str) -> bool;
    /// Deletes the stored challenge only if it has expired by `now_ms`.
    async fn evict_expired(&self, address: &str, now_ms: i64);
}

#[derive(Default)]
pub struct MemoryChallengeStore {
    entries: Mutex<HashMap<String, Challenge>>,
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn get(&self, address: &str) -> Option<Challenge> {
        self.entries.lock().await.get(address).cloned()
    }

    async fn put(&self, address: &str, challenge: Challenge) {
        self.entries
            .lock()
            .await
            .insert(address.to_string(), challenge);
    }

    async fn remove(&self, address: &str) {
        self.entries.lock().await.remove(address);
    }

    async fn remove_if_matches(&self, address: &str, nonce: &str) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(address) {
            Some(stored) if stored.nonce == nonce => {
                entries.remove(address);
                true
            }
            _ => false,
        }
    }

    async fn evict_expired(&self, address: &str, now_ms: i64) {
        let mut entries = self.entries.lock().await;
        if let Some(stored) = entries.get(address) {
            if now_ms > stored.expires_at_ms {
                entries.remove(address);
            }
        }
    }
}

pub struct NonceAuthenticator {
    store: Arc<dyn ChallengeStore>,
    ttl: Duration,
}

impl NonceAuthenticator {
    pub fn new(store: Arc<dyn ChallengeStore>, ttl: Duration) -> Self {
        assert!(ttl >= Duration::from_secs(1), "Challenge TTL must be >= 1s");
        assert!(
            ttl <= Duration::from_secs(3_600),
            "Challenge TTL exceeds one hour"
        );
        Self { store, ttl }
    }

    /// Issues a fresh challenge for the address, replacing any previous
    /// one, and schedules its eviction at expiry.
    pub async fn issue_challenge(&self, address: &str) -> Result<String, AuthError> {
        let nonce = self.issue_challenge_at(address, now_ms()).await?;

        let store = Arc::clone(&self.store);
        let key = normalize_key(address);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            // A reissued challenge carries a later expiry and survives this
            store.evict_expired(&key, now_ms()).await;
        });

        Ok(nonce)
    }

    pub async fn verify(&self, address: &str, signature: &str, nonce: &str) -> bool {
        self.verify_at(address, signature, nonce, now_ms()).await
    }

    async fn issue_challenge_at(&self, address: &str, now_ms: i64) -> Result<String, AuthError> {
        if !wallet::is_valid_address(address) {
            return Err(AuthError::InvalidAddress(address.to_string()));
        }

        let mut bytes = [0u8; NONCE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);

        let ttl_ms = i64::try_from(self.ttl.as_millis()).expect("TTL bounded by constructor");
        self.store
            .put(
                &normalize_key(address),
                Challenge {
                    nonce: nonce.clone(),
                    expires_at_ms: now_ms + ttl_ms,
                },
            )
            .await;

        Ok(nonce)
    }

    async fn verify_at(&self, address: &str, signature: &str, nonce: &str, now_ms: i64) -> bool {
        if !wallet::is_valid_address(address) {
            return false;
        }
        let key = normalize_key(address);

        let Some(stored) = self.store.get(&key).await else {
            return false;
        };
        if now_ms > stored.expires_at_ms {
            self.store.remove(&key).await;
            return false;
        }
        if stored.nonce != nonce {
            return false;
        }

        let message = wallet::auth_message(address.trim(), nonce);
        if !wallet::verify_personal_signature(&message, signature, address) {
            debug!("Signature verification failed for {key}");
            return false;
        }

        // Single use: only the caller that wins the atomic removal is
        // authenticated; a concurrent verify with the same nonce loses
        self.store.remove_if_matches(&key, nonce).await
    }
}

fn normalize_key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
