//! Identity-keyed query cache.
//!
//! Reads of one identity are coalesced behind a per-identity lock, so a
//! second read that arrives while the first is in flight waits for it instead
//! of calling the remote side again. Invalidation bumps an epoch per identity;
//! results fetched under an older epoch are never installed.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::models::{CtScan, ExternalApiConfig, ScanId, UserProfile, UserRole};

/// Group of identities sharing an operation, addressed by family invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    CurrentUserProfile,
    Scans,
    Scan,
    ExternalApiConfig,
    IsAdmin,
    CallerRole,
}

impl QueryFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryFamily::CurrentUserProfile => "currentUserProfile",
            QueryFamily::Scans => "scans",
            QueryFamily::Scan => "scan",
            QueryFamily::ExternalApiConfig => "externalApiConfig",
            QueryFamily::IsAdmin => "isAdmin",
            QueryFamily::CallerRole => "callerRole",
        }
    }
}

/// Identity of one cache entry, derived from the operation and its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CurrentUserProfile,
    AllScans,
    Scan(ScanId),
    ExternalApiConfig,
    IsCallerAdmin,
    CallerRole,
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        match self {
            QueryKey::CurrentUserProfile => QueryFamily::CurrentUserProfile,
            QueryKey::AllScans => QueryFamily::Scans,
            QueryKey::Scan(_) => QueryFamily::Scan,
            QueryKey::ExternalApiConfig => QueryFamily::ExternalApiConfig,
            QueryKey::IsCallerAdmin => QueryFamily::IsAdmin,
            QueryKey::CallerRole => QueryFamily::CallerRole,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Scan(id) => write!(f, "{}/{}", self.family().as_str(), id),
            _ => f.write_str(self.family().as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Profile(Option<UserProfile>),
    Scans(Vec<CtScan>),
    Scan(Option<CtScan>),
    ApiConfig(Option<ExternalApiConfig>),
    Flag(bool),
    Role(UserRole),
}

/// Outcome of one fetch as stored in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Value(CachedValue),
    /// Only shared with reads that were waiting on the failing fetch.
    Failed(String),
}

struct Entry {
    settled: Settled,
    epoch: u64,
    seq: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    epochs: HashMap<QueryKey, u64>,
    inflight: HashMap<QueryKey, Arc<Mutex<()>>>,
}

impl CacheState {
    fn epoch(&self, key: &QueryKey) -> u64 {
        self.epochs.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: QueryKey) {
        *self.epochs.entry(key).or_insert(0) += 1;
    }

    /// Drop the stored entry. The epoch is only kept while a fetch may still
    /// compare against it.
    fn evict(&mut self, key: QueryKey) {
        self.bump(key);
        self.entries.remove(&key);
        if !self.inflight.contains_key(&key) {
            self.epochs.remove(&key);
        }
    }

    /// Forget the fetch lock of `key` once no other read holds it.
    fn release(&mut self, key: QueryKey, key_lock: &Arc<Mutex<()>>) {
        let ours = self
            .inflight
            .get(&key)
            .is_some_and(|lock| Arc::ptr_eq(lock, key_lock));
        // One reference in the map, one held by the caller.
        if ours && Arc::strong_count(key_lock) == 2 {
            self.inflight.remove(&key);
            if !self.entries.contains_key(&key) {
                self.epochs.remove(&key);
            }
        }
    }

    fn valid(&self, key: &QueryKey, requested_at: u64) -> Option<Settled> {
        let entry = self.entries.get(key)?;
        if entry.epoch != self.epoch(key) {
            return None;
        }
        match entry.settled {
            Settled::Value(_) => Some(entry.settled.clone()),
            Settled::Failed(_) if entry.seq > requested_at => Some(entry.settled.clone()),
            Settled::Failed(_) => None,
        }
    }

    fn known_keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .entries
            .keys()
            .chain(self.epochs.keys())
            .chain(self.inflight.keys())
            .copied()
            .collect();
        keys.sort_by_key(|key| key.to_string());
        keys.dedup();
        keys
    }
}

pub struct QueryCache {
    state: Mutex<CacheState>,
    seq: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// Return the valid entry for `key`, or run `fetcher` once and store its outcome.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Settled
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Settled>,
    {
        let requested_at = self.seq.load(Ordering::SeqCst);

        let key_lock = {
            let mut state = self.state.lock().await;
            if let Some(hit) = state.valid(&key, requested_at) {
                debug!("Cache hit: {}", key);
                return hit;
            }
            Arc::clone(
                state
                    .inflight
                    .entry(key)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _guard = key_lock.lock().await;

        let epoch = {
            let mut state = self.state.lock().await;
            if let Some(hit) = state.valid(&key, requested_at) {
                debug!("Joined in-flight fetch: {}", key);
                state.release(key, &key_lock);
                return hit;
            }
            state.epoch(&key)
        };

        debug!("Fetching {}", key);
        let settled = fetcher().await;

        let mut state = self.state.lock().await;
        if state.epoch(&key) == epoch {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            state.entries.insert(
                key,
                Entry {
                    settled: settled.clone(),
                    epoch,
                    seq,
                },
            );
        } else {
            debug!("Discarding result for invalidated {}", key);
        }
        state.release(key, &key_lock);
        settled
    }

    /// Current valid value for `key`, without fetching.
    pub async fn peek(&self, key: &QueryKey) -> Option<CachedValue> {
        let state = self.state.lock().await;
        match state.valid(key, u64::MAX) {
            Some(Settled::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub async fn invalidate(&self, key: QueryKey) {
        debug!("Invalidating {}", key);
        self.state.lock().await.evict(key);
    }

    /// Invalidate every identity of `family`, including ones still in flight.
    pub async fn invalidate_family(&self, family: QueryFamily) {
        debug!("Invalidating family {}", family.as_str());
        let mut state = self.state.lock().await;
        for key in state.known_keys() {
            if key.family() == family {
                state.evict(key);
            }
        }
    }

    /// Drop every entry. Fetches still in flight will not install their results.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        for key in state.known_keys() {
            state.evict(key);
        }
        debug!("Query cache cleared");
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|(key, entry)| entry.epoch == state.epoch(key))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
