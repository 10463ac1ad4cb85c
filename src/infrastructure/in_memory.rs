use crate::domain::cache::{CacheEntry, CacheKey};
use crate::domain::ports::CacheStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    needs_refetch: HashSet<CacheKey>,
}

/// A session-scoped in-memory query cache.
///
/// Values live behind `Arc<RwLock<..>>` so clones share one cache. Reads that
/// go to the network are registered per key through [`spawn_read`] so that
/// [`CacheStore::cancel_in_flight`] can abort them before an optimistic write.
///
/// [`spawn_read`]: InMemoryCacheStore::spawn_read
#[derive(Default, Clone)]
pub struct InMemoryCacheStore {
    state: Arc<RwLock<CacheState>>,
    /// Running reads per key, tagged with the id of the read that owns the slot.
    in_flight: Arc<Mutex<HashMap<CacheKey, (u64, JoinHandle<()>)>>>,
    next_read: Arc<AtomicU64>,
}

impl InMemoryCacheStore {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a background read for `key` whose result is written to the
    /// cache when it resolves. A previous read for the same key is aborted.
    /// A finished read releases its slot.
    pub async fn spawn_read<F>(&self, key: CacheKey, read: F)
    where
        F: Future<Output = Result<CacheEntry>> + Send + 'static,
    {
        let read_id = self.next_read.fetch_add(1, Ordering::Relaxed);
        let state = Arc::clone(&self.state);
        let in_flight = Arc::clone(&self.in_flight);
        let task_key = key.clone();

        // Held until the handle is registered, so the task cannot release its
        // slot before it exists.
        let mut slots = self.in_flight.lock().await;
        let handle = tokio::spawn(async move {
            match read.await {
                Ok(entry) => {
                    let mut state = state.write().await;
                    state.needs_refetch.remove(&task_key);
                    state.entries.insert(task_key.clone(), entry);
                }
                Err(e) => tracing::warn!(key = %task_key, error = %e, "cache read failed"),
            }
            let mut slots = in_flight.lock().await;
            if slots.get(&task_key).is_some_and(|(id, _)| *id == read_id) {
                slots.remove(&task_key);
            }
        });

        if let Some((_, previous)) = slots.insert(key, (read_id, handle)) {
            previous.abort();
        }
    }

    /// All cached values, keyed by their display form.
    pub async fn entries(&self) -> BTreeMap<String, CacheEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.get(key).cloned())
    }

    async fn set(&self, key: &CacheKey, value: CacheEntry) -> Result<()> {
        let mut state = self.state.write().await;
        state.needs_refetch.remove(key);
        state.entries.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.remove(key);
        Ok(())
    }

    async fn cancel_in_flight(&self, key: &CacheKey) -> Result<()> {
        let slot = self.in_flight.lock().await.remove(key);
        if let Some((_, handle)) = slot {
            handle.abort();
            // Awaiting the aborted task guarantees it can no longer write.
            if let Err(e) = handle.await
                && !e.is_cancelled()
            {
                tracing::warn!(key = %key, error = %e, "in-flight read panicked");
            }
        }
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.remove(key);
        state.needs_refetch.insert(key.clone());
        Ok(())
    }

    async fn needs_refetch(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.state.read().await.needs_refetch.contains(key))
    }
}
