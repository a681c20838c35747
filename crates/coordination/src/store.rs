//! The Coordination Store trait (C1) plus an in-memory implementation
//! built on `parking_lot` mutexes over `HashMap`s: lazy TTL expiry on
//! read, plus a periodic sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token returned by `acquire_lock`; `release_lock` only succeeds
/// if the caller presents the same token, so a crashed owner's
/// auto-expired lock can never be stolen and then accidentally released
/// out from under a later owner.
pub type LockToken = String;

/// The per-thread state tracked after each orchestrator invocation:
/// last event id, user id, timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadState {
    pub last_event_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Backend-agnostic coordination primitives: dedup reservation,
/// per-thread advisory locking, and last-thread-state tracking.
/// Implementations may be in-memory (single node) or networked
/// (multi-node) — callers never assume which.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Set-if-absent with TTL. Returns `true` exactly once per key
    /// within the TTL window (single-winner semantics).
    async fn reserve_dedup(&self, key: &str, ttl: Duration) -> bool;

    /// Set-if-absent with TTL and a random token. `None` means the lock
    /// is currently held by someone else.
    async fn acquire_lock(&self, key: &str, ttl: Duration) -> Option<LockToken>;

    /// Succeeds iff `token` matches the current holder's token.
    async fn release_lock(&self, key: &str, token: &LockToken) -> bool;

    async fn set_thread_state(&self, key: &str, state: ThreadState, ttl: Duration);

    async fn get_thread_state(&self, key: &str) -> Option<ThreadState>;

    /// Generic TTL key-value used for the feedback-follow-up pending
    /// entry (kept in the Coordination Store,
    /// keyed by `(channel, user_id)`).
    async fn set_pending(&self, key: &str, value: String, ttl: Duration);

    async fn get_pending(&self, key: &str) -> Option<String>;

    async fn clear_pending(&self, key: &str);
}

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

struct LockEntry {
    token: LockToken,
    expires_at: Instant,
}

/// Sweep threshold following the usual "lazy cleanup
/// when the map grows large").
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Default)]
pub struct InMemoryCoordinationStore {
    dedup: Mutex<HashMap<String, Instant>>,
    locks: Mutex<HashMap<String, LockEntry>>,
    thread_state: Mutex<HashMap<String, Expiring<ThreadState>>>,
    pending: Mutex<HashMap<String, Expiring<String>>>,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodic sweep task entry point; also invoked lazily on growth.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.dedup.lock().retain(|_, exp| now < *exp);
        self.locks.lock().retain(|_, e| now < e.expires_at);
        self.thread_state.lock().retain(|_, e| e.is_live());
        self.pending.lock().retain(|_, e| e.is_live());
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn reserve_dedup(&self, key: &str, ttl: Duration) -> bool {
        let mut map = self.dedup.lock();
        if map.len() > SWEEP_THRESHOLD {
            let now = Instant::now();
            map.retain(|_, exp| now < *exp);
        }
        let now = Instant::now();
        if let Some(exp) = map.get(key) {
            if now < *exp {
                return false;
            }
        }
        map.insert(key.to_string(), now + ttl);
        true
    }

    async fn acquire_lock(&self, key: &str, ttl: Duration) -> Option<LockToken> {
        let mut map = self.locks.lock();
        let now = Instant::now();
        if let Some(entry) = map.get(key) {
            if now < entry.expires_at {
                return None;
            }
        }
        let token = Uuid::new_v4().to_string();
        map.insert(
            key.to_string(),
            LockEntry {
                token: token.clone(),
                expires_at: now + ttl,
            },
        );
        Some(token)
    }

    async fn release_lock(&self, key: &str, token: &LockToken) -> bool {
        let mut map = self.locks.lock();
        match map.get(key) {
            Some(entry) if &entry.token == token => {
                map.remove(key);
                true
            }
            _ => false,
        }
    }

    async fn set_thread_state(&self, key: &str, state: ThreadState, ttl: Duration) {
        self.thread_state
            .lock()
            .insert(key.to_string(), Expiring::new(state, ttl));
    }

    async fn get_thread_state(&self, key: &str) -> Option<ThreadState> {
        let map = self.thread_state.lock();
        map.get(key).filter(|e| e.is_live()).map(|e| e.value.clone())
    }

    async fn set_pending(&self, key: &str, value: String, ttl: Duration) {
        self.pending
            .lock()
            .insert(key.to_string(), Expiring::new(value, ttl));
    }

    async fn get_pending(&self, key: &str) -> Option<String> {
        let map = self.pending.lock();
        map.get(key).filter(|e| e.is_live()).map(|e| e.value.clone())
    }

    async fn clear_pending(&self, key: &str) {
        self.pending.lock().remove(key);
    }
}

/// Degraded-mode stand-in for "Coordination Store = nil":
/// dedup always reports unseen, locks are always uncontested, thread
/// state and pending entries are never remembered. Used when no
/// coordination backend is configured; callers get weaker guarantees,
/// never a refusal to serve.
#[derive(Default)]
pub struct NullCoordinationStore;

#[async_trait]
impl CoordinationStore for NullCoordinationStore {
    async fn reserve_dedup(&self, _key: &str, _ttl: Duration) -> bool {
        true
    }

    async fn acquire_lock(&self, _key: &str, _ttl: Duration) -> Option<LockToken> {
        Some(Uuid::new_v4().to_string())
    }

    async fn release_lock(&self, _key: &str, _token: &LockToken) -> bool {
        true
    }

    async fn set_thread_state(&self, _key: &str, _state: ThreadState, _ttl: Duration) {}

    async fn get_thread_state(&self, _key: &str) -> Option<ThreadState> {
        None
    }

    async fn set_pending(&self, _key: &str, _value: String, _ttl: Duration) {}

    async fn get_pending(&self, _key: &str) -> Option<String> {
        None
    }

    async fn clear_pending(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dedup_is_single_winner() {
        let store = InMemoryCoordinationStore::new();
        assert!(store.reserve_dedup("k", Duration::from_secs(10)).await);
        assert!(!store.reserve_dedup("k", Duration::from_secs(10)).await);
    }

    #[tokio::test]
    async fn dedup_expires() {
        let store = InMemoryCoordinationStore::new();
        assert!(store.reserve_dedup("k", Duration::from_millis(10)).await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.reserve_dedup("k", Duration::from_secs(10)).await);
    }

    #[tokio::test]
    async fn lock_release_requires_matching_token() {
        let store = InMemoryCoordinationStore::new();
        let token = store.acquire_lock("t", Duration::from_secs(10)).await.unwrap();
        assert!(store.acquire_lock("t", Duration::from_secs(10)).await.is_none());
        assert!(!store.release_lock("t", &"wrong-token".to_string()).await);
        assert!(store.release_lock("t", &token).await);
        assert!(store.acquire_lock("t", Duration::from_secs(10)).await.is_some());
    }

    #[tokio::test]
    async fn lock_auto_expires() {
        let store = InMemoryCoordinationStore::new();
        let _token = store.acquire_lock("t", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.acquire_lock("t", Duration::from_secs(10)).await.is_some());
    }

    #[tokio::test]
    async fn null_store_never_contends() {
        let store = NullCoordinationStore;
        assert!(store.reserve_dedup("k", Duration::from_secs(1)).await);
        assert!(store.reserve_dedup("k", Duration::from_secs(1)).await);
        assert!(store.acquire_lock("t", Duration::from_secs(1)).await.is_some());
    }
}
