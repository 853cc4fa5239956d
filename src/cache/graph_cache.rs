use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::store::{read_document, write_document, CacheEntry};
use super::FlushPolicy;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::graph::KnowledgeGraph;

/// Tunables for [`GraphCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Hot tier size (at least 1).
    pub memory_capacity: usize,
    pub flush_policy: FlushPolicy,
    /// Entries older than this are misses.
    pub ttl: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            memory_capacity: 1000,
            flush_policy: FlushPolicy::default(),
            ttl: None,
        }
    }
}

impl From<&CacheConfig> for CacheOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            memory_capacity: config.memory_capacity,
            flush_policy: config.flush_policy,
            ttl: config.ttl(),
        }
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hot_entries: usize,
    pub hot_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub dirty: bool,
}

struct CacheState {
    hot: LruCache<String, CacheEntry>,
    entries: HashMap<String, CacheEntry>,
    dirty: bool,
    hot_hits: u64,
    durable_hits: u64,
    misses: u64,
    expired: u64,
}

/// Thread-safe two-tier cache: resource identifier -> unlimited graph.
///
/// All reads, writes and flushes go through a single mutex, so concurrent
/// crawl branches never observe or persist a half-applied update.
pub struct GraphCache {
    path: Option<PathBuf>,
    options: CacheOptions,
    state: Mutex<CacheState>,
}

impl GraphCache {
    fn with_path(path: Option<PathBuf>, options: CacheOptions) -> Self {
        let cap = NonZeroUsize::new(options.memory_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            path,
            options,
            state: Mutex::new(CacheState {
                hot: LruCache::new(cap),
                entries: HashMap::new(),
                dirty: false,
                hot_hits: 0,
                durable_hits: 0,
                misses: 0,
                expired: 0,
            }),
        }
    }

    /// Cache with no durable tier. Flushes are no-ops.
    pub fn in_memory(options: CacheOptions) -> Self {
        Self::with_path(None, options)
    }

    /// Cache backed by the document at `path`, loaded once here.
    ///
    /// # Arguments
    ///
    /// * `path` - Durable document location, created on first flush
    /// * `options` - Hot tier size, flush policy and TTL
    ///
    /// A missing or unreadable document is logged and the cache starts empty.
    pub fn open(path: impl AsRef<Path>, options: CacheOptions) -> Self {
        let cache = Self::with_path(Some(path.as_ref().to_path_buf()), options);
        match cache.load_from_durable() {
            Ok(0) => log::info!("Graph cache starting empty ({})", path.as_ref().display()),
            Ok(n) => log::info!("Graph cache loaded: {} entries from {}", n, path.as_ref().display()),
            Err(e) => log::warn!(
                "Could not load graph cache from {}, starting empty: {}",
                path.as_ref().display(),
                e
            ),
        }
        cache
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.options.ttl {
            Some(ttl) => !entry.is_older_than(ttl),
            None => true,
        }
    }

    /// Durable document location, `None` for in-memory caches
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// When dirty state is written to the durable document
    pub fn flush_policy(&self) -> FlushPolicy {
        self.options.flush_policy
    }

    /// Cached graph for `resource`, checking the hot tier first.
    ///
    /// # Arguments
    ///
    /// * `resource` - Resource identifier the graph was fetched for
    ///
    /// # Returns
    ///
    /// Some(graph) if a fresh entry exists in either tier, None otherwise.
    /// Durable hits are promoted into the hot tier; expired entries count as misses.
    pub fn get(&self, resource: &str) -> Option<Arc<KnowledgeGraph>> {
        let mut state = self.lock();

        if let Some(entry) = state.hot.get(resource).cloned() {
            if self.is_fresh(&entry) {
                state.hot_hits += 1;
                return Some(entry.graph);
            }
            state.hot.pop(resource);
            state.expired += 1;
            state.misses += 1;
            return None;
        }

        match state.entries.get(resource).cloned() {
            Some(entry) if self.is_fresh(&entry) => {
                state.durable_hits += 1;
                let graph = Arc::clone(&entry.graph);
                state.hot.put(resource.to_string(), entry);
                Some(graph)
            }
            Some(_) => {
                state.expired += 1;
                state.misses += 1;
                None
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store the unlimited graph for `resource`, replacing any previous entry.
    ///
    /// # Arguments
    ///
    /// * `resource` - Resource identifier (used as key)
    /// * `graph` - Unlimited graph built from the resource's triples
    ///
    /// # Returns
    ///
    /// The stored graph, shared with the cache
    ///
    /// With [`FlushPolicy::WriteThrough`] the durable document is rewritten
    /// before returning; a failed write is logged and retried on the next flush.
    pub fn put(&self, resource: &str, graph: KnowledgeGraph) -> Arc<KnowledgeGraph> {
        let entry = CacheEntry::new(graph);
        let graph = Arc::clone(&entry.graph);

        let mut state = self.lock();
        state.hot.put(resource.to_string(), entry.clone());
        state.entries.insert(resource.to_string(), entry);
        state.dirty = true;

        if self.options.flush_policy == FlushPolicy::WriteThrough {
            if let Err(e) = self.flush_locked(&mut state) {
                log::warn!("Failed to persist graph cache: {}", e);
            }
        }

        graph
    }

    /// Check if `resource` has an entry, fresh or not
    pub fn contains(&self, resource: &str) -> bool {
        self.lock().entries.contains_key(resource)
    }

    /// Drop `resource` from both tiers. Returns true if it was cached.
    pub fn remove(&self, resource: &str) -> bool {
        let mut state = self.lock();
        state.hot.pop(resource);
        let removed = state.entries.remove(resource).is_some();
        if removed {
            state.dirty = true;
        }
        removed
    }

    /// Get the number of entries in the durable tier
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Snapshot of the hit/miss counters and tier sizes
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            hot_entries: state.hot.len(),
            hot_hits: state.hot_hits,
            durable_hits: state.durable_hits,
            misses: state.misses,
            expired: state.expired,
            dirty: state.dirty,
        }
    }

    /// All entries, sorted by resource identifier.
    pub fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        let state = self.lock();
        let mut entries: Vec<_> = state
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn flush_locked(&self, state: &mut CacheState) -> Result<()> {
        if let Some(path) = &self.path {
            write_document(path, &state.entries)?;
            log::debug!("Graph cache flushed: {} entries", state.entries.len());
        }
        state.dirty = false;
        Ok(())
    }

    /// Rewrite the durable document with the full cache contents.
    pub fn flush_to_durable(&self) -> Result<()> {
        let mut state = self.lock();
        self.flush_locked(&mut state)
    }

    /// Flush only if something changed since the last flush.
    ///
    /// # Returns
    ///
    /// Ok(true) if the document was rewritten, Ok(false) if nothing was dirty
    pub fn flush_if_dirty(&self) -> Result<bool> {
        let mut state = self.lock();
        if !state.dirty {
            return Ok(false);
        }
        self.flush_locked(&mut state)?;
        Ok(true)
    }

    /// Replace the in-memory contents with the durable document.
    ///
    /// # Returns
    ///
    /// Number of entries loaded, 0 if the document is missing
    pub fn load_from_durable(&self) -> Result<usize> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(0),
        };

        let loaded = read_document(path)?.unwrap_or_default();
        let count = loaded.len();

        let mut state = self.lock();
        state.hot.clear();
        state.entries = loaded;
        state.dirty = false;
        Ok(count)
    }

    /// Periodically flush dirty state until the cache is dropped.
    ///
    /// # Arguments
    ///
    /// * `period` - Time between flush attempts
    ///
    /// The task only holds a weak reference and exits once the last `Arc` is gone.
    pub fn spawn_flusher(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                if let Err(e) = cache.flush_if_dirty() {
                    log::warn!("Periodic graph cache flush failed: {}", e);
                }
            }
        })
    }
}

impl Drop for GraphCache {
    fn drop(&mut self) {
        if self.path.is_none() {
            return;
        }
        if let Err(e) = self.flush_if_dirty() {
            log::warn!("Failed to persist graph cache on shutdown: {}", e);
        }
    }
}
