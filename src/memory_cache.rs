use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::adjuncts::InstanceAdjuncts;
use crate::cache::Cache;
use crate::config::CacheSettings;
use crate::types::InstanceId;

/// In-memory cache of instance snapshots.
///
/// A small LRU keyed by instance, with optional TTL. Clones share state, so
/// one cache can back several engines in the same process.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<CacheState>>,
    capacity: usize,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<InstanceId, CacheEntry>,
    order: VecDeque<InstanceId>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    adjuncts: Arc<InstanceAdjuncts>,
    stored_at: Instant,
}

impl MemoryCache {
    /// Creates a new cache holding at most `capacity` instances.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState::default())),
            capacity,
            ttl: None,
        }
    }

    /// Creates a cache from settings.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let cache = Self::new(settings.capacity);
        match settings.ttl() {
            Some(ttl) => cache.with_ttl(ttl),
            None => cache,
        }
    }

    /// Configures a time-to-live for cache entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Number of cached instances.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.inner.lock().expect("poisoned lock")
    }

    fn remove_key(state: &mut CacheState, key: &InstanceId) {
        if state.entries.remove(key).is_some() {
            state.order.retain(|existing| existing != key);
        }
    }

    fn touch(state: &mut CacheState, key: &InstanceId) {
        state.order.retain(|existing| existing != key);
        state.order.push_back(key.clone());
    }

    fn is_expired(entry: &CacheEntry, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > ttl
    }

    fn prune_expired(state: &mut CacheState, ttl: Duration, now: Instant) {
        state
            .entries
            .retain(|_, entry| !Self::is_expired(entry, ttl, now));
        state.order.retain(|key| state.entries.contains_key(key));
    }

    fn evict_if_needed(state: &mut CacheState, capacity: usize) {
        while state.entries.len() > capacity {
            let Some(key) = state.order.pop_front() else {
                break;
            };
            tracing::trace!(instance = %key, "evicting adjuncts snapshot");
            state.entries.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_adjuncts(&self, instance: &InstanceId) -> Option<Arc<InstanceAdjuncts>> {
        if self.capacity == 0 {
            return None;
        }

        let now = Instant::now();
        let mut guard = self.lock();

        if let Some(ttl) = self.ttl
            && let Some(entry) = guard.entries.get(instance)
            && Self::is_expired(entry, ttl, now)
        {
            Self::remove_key(&mut guard, instance);
            return None;
        }

        let adjuncts = guard
            .entries
            .get(instance)
            .map(|entry| Arc::clone(&entry.adjuncts));
        if adjuncts.is_some() {
            Self::touch(&mut guard, instance);
        }
        adjuncts
    }

    async fn set_adjuncts(&self, instance: &InstanceId, adjuncts: Arc<InstanceAdjuncts>) {
        if self.capacity == 0 {
            return;
        }

        let now = Instant::now();
        let mut guard = self.lock();

        if let Some(ttl) = self.ttl {
            Self::prune_expired(&mut guard, ttl, now);
        }

        guard.entries.insert(
            instance.clone(),
            CacheEntry {
                adjuncts,
                stored_at: now,
            },
        );
        Self::touch(&mut guard, instance);
        Self::evict_if_needed(&mut guard, self.capacity);
    }

    async fn invalidate_instance(&self, instance: &InstanceId) {
        let mut guard = self.lock();
        Self::remove_key(&mut guard, instance);
    }

    async fn clear(&self) {
        let mut guard = self.lock();
        guard.entries.clear();
        guard.order.clear();
    }
}
