//! Three-tier cache for search results.
//!
//! Tiers, fastest first:
//! 1. in-memory LRU (hard-capped),
//! 2. sharded JSON files under `<dir>/<xx>/<hash>.json`,
//! 3. optional persistent store.
//!
//! Lookups promote hits upward (file → memory, store → memory + file).
//! Expired entries are treated as misses at read time, so a hit never
//! returns stale data.  Every tier is best-effort: I/O failures are logged
//! and the request continues.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use md5::{Digest, Md5};
use sahayak_store::SearchStore;
use sahayak_types::{RawResult, ResultOrigin};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One cached result set, keyed by the md5 of the normalised query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_hash: String,
    pub query: String,
    pub results: Vec<RawResult>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
    pub source: ResultOrigin,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Snapshot of cache health for the admin surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStatus {
    pub memory_entries: usize,
    pub memory_capacity: usize,
    pub file_entries: usize,
    pub store_entries: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub cache_dir: String,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
}

/// `md5(lowercase(trim(query)))` as lowercase hex.
pub fn hash_query(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    let mut hasher = Md5::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct SearchCache {
    memory: Mutex<LruCache<String, CacheEntry>>,
    dir: PathBuf,
    default_ttl: Duration,
    store: Option<Arc<SearchStore>>,
    counters: Mutex<Counters>,
}

impl SearchCache {
    pub fn new(
        dir: impl Into<PathBuf>,
        memory_max: usize,
        default_ttl_hours: u64,
        store: Option<Arc<SearchStore>>,
    ) -> Self {
        let dir = dir.into();
        let capacity = NonZeroUsize::new(memory_max.max(1)).expect("max(1) is non-zero");
        info!(dir = %dir.display(), memory_max, "search cache initialised");
        Self {
            memory: Mutex::new(LruCache::new(capacity)),
            dir,
            default_ttl: Duration::hours(default_ttl_hours as i64),
            store,
            counters: Mutex::new(Counters::default()),
        }
    }

    fn file_path(&self, hash: &str) -> PathBuf {
        self.dir.join(&hash[..2]).join(format!("{hash}.json"))
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Check memory, file, then store.  Expired entries anywhere count as
    /// a miss and are lazily dropped.
    pub async fn get(&self, query: &str) -> Option<CacheEntry> {
        let hash = hash_query(query);

        // Tier 1: memory.
        let mem_hit = {
            let mut memory = self.memory.lock().expect("cache lock poisoned");
            let fresh = match memory.get_mut(&hash) {
                Some(entry) if !entry.is_expired() => {
                    entry.hit_count += 1;
                    Some(entry.clone())
                }
                Some(_) => None,
                None => None,
            };
            if fresh.is_none() && memory.contains(&hash) {
                memory.pop(&hash);
            }
            fresh
        };
        if let Some(entry) = mem_hit {
            self.record_hit();
            debug!(hash = %hash, tier = "memory", "cache hit");
            return Some(entry);
        }

        // Tier 2: file.
        if let Some(entry) = self.read_file_tier(&hash).await {
            if entry.is_expired() {
                let _ = tokio::fs::remove_file(self.file_path(&hash)).await;
            } else {
                let mut entry = entry;
                entry.hit_count += 1;
                self.promote_to_memory(entry.clone());
                self.record_hit();
                debug!(hash = %hash, tier = "file", "cache hit");
                return Some(entry);
            }
        }

        // Tier 3: persistent store.
        if let Some(entry) = self.read_store_tier(&hash) {
            if entry.is_expired() {
                if let Some(ref store) = self.store {
                    let _ = store.remove_cache(&hash);
                }
            } else {
                let mut entry = entry;
                entry.hit_count += 1;
                self.promote_to_memory(entry.clone());
                self.write_file_tier(&entry).await;
                self.record_hit();
                debug!(hash = %hash, tier = "store", "cache hit");
                return Some(entry);
            }
        }

        self.record_miss();
        debug!(hash = %hash, "cache miss");
        None
    }

    // ── Write ────────────────────────────────────────────────────────────────

    /// Write a result set to every available tier.  A non-positive TTL
    /// falls back to the default so `expires_at` always exceeds
    /// `created_at`.
    pub async fn put(
        &self,
        query: &str,
        results: Vec<RawResult>,
        ttl: Option<Duration>,
        source: ResultOrigin,
    ) {
        if results.is_empty() {
            return;
        }

        let ttl = match ttl {
            Some(ttl) if ttl > Duration::zero() => ttl,
            _ => self.default_ttl,
        };
        let now = Utc::now();
        let entry = CacheEntry {
            query_hash: hash_query(query),
            query: query.to_string(),
            results,
            created_at: now,
            expires_at: now + ttl,
            hit_count: 0,
            source,
        };

        self.promote_to_memory(entry.clone());
        self.write_file_tier(&entry).await;
        if let Some(ref store) = self.store {
            match serde_json::to_vec(&entry) {
                Ok(bytes) => {
                    if let Err(err) = store.put_cache(&entry.query_hash, &bytes) {
                        warn!(error = %err, "store cache write failed");
                    }
                }
                Err(err) => warn!(error = %err, "cache entry serialisation failed"),
            }
        }
        debug!(hash = %entry.query_hash, results = entry.results.len(), "cached result set");
    }

    /// Drop a query from every tier.
    pub async fn invalidate(&self, query: &str) {
        let hash = hash_query(query);
        self.memory.lock().expect("cache lock poisoned").pop(&hash);
        let _ = tokio::fs::remove_file(self.file_path(&hash)).await;
        if let Some(ref store) = self.store {
            if let Err(err) = store.remove_cache(&hash) {
                warn!(error = %err, "store cache invalidation failed");
            }
        }
    }

    // ── Maintenance ──────────────────────────────────────────────────────────

    /// Sweep every tier for entries past their expiry.  Returns how many
    /// were removed.  Callers decide the schedule; nothing here runs on
    /// its own.
    pub async fn cleanup_expired(&self) -> usize {
        let mut removed = 0usize;

        {
            let mut memory = self.memory.lock().expect("cache lock poisoned");
            let expired: Vec<String> = memory
                .iter()
                .filter(|(_, e)| e.is_expired())
                .map(|(k, _)| k.clone())
                .collect();
            for hash in expired {
                memory.pop(&hash);
                removed += 1;
            }
        }

        removed += self.cleanup_file_tier().await;

        if let Some(ref store) = self.store {
            match store.cache_entries() {
                Ok(entries) => {
                    for (hash, bytes) in entries {
                        let expired = serde_json::from_slice::<CacheEntry>(&bytes)
                            .map(|e| e.is_expired())
                            .unwrap_or(true);
                        if expired && store.remove_cache(&hash).unwrap_or(false) {
                            removed += 1;
                        }
                    }
                }
                Err(err) => warn!(error = %err, "store cache sweep failed"),
            }
        }

        info!(removed, "cache cleanup finished");
        removed
    }

    /// Empty every tier.
    pub async fn clear_all(&self) {
        self.memory.lock().expect("cache lock poisoned").clear();
        if let Ok(mut dir) = tokio::fs::read_dir(&self.dir).await {
            while let Ok(Some(shard)) = dir.next_entry().await {
                if shard.path().is_dir() {
                    let _ = tokio::fs::remove_dir_all(shard.path()).await;
                }
            }
        }
        if let Some(ref store) = self.store {
            if let Err(err) = store.clear_cache() {
                warn!(error = %err, "store cache clear failed");
            }
        }
        let mut counters = self.counters.lock().expect("cache lock poisoned");
        *counters = Counters::default();
        info!("all cache tiers cleared");
    }

    pub async fn status(&self) -> CacheStatus {
        let (memory_entries, memory_capacity) = {
            let memory = self.memory.lock().expect("cache lock poisoned");
            (memory.len(), memory.cap().get())
        };
        let (hits, misses) = {
            let counters = self.counters.lock().expect("cache lock poisoned");
            (counters.hits, counters.misses)
        };
        let total = hits + misses;
        CacheStatus {
            memory_entries,
            memory_capacity,
            file_entries: self.count_file_tier().await,
            store_entries: self
                .store
                .as_ref()
                .and_then(|s| s.cache_len().ok()),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            cache_dir: self.dir.display().to_string(),
        }
    }

    // ── Tier helpers ─────────────────────────────────────────────────────────

    fn promote_to_memory(&self, entry: CacheEntry) {
        let mut memory = self.memory.lock().expect("cache lock poisoned");
        memory.put(entry.query_hash.clone(), entry);
    }

    async fn read_file_tier(&self, hash: &str) -> Option<CacheEntry> {
        let path = self.file_path(hash);
        let raw = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable cache file");
                None
            }
        }
    }

    async fn write_file_tier(&self, entry: &CacheEntry) {
        let path = self.file_path(&entry.query_hash);
        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let bytes = serde_json::to_vec_pretty(entry)?;
            tokio::fs::write(&path, bytes).await?;
            anyhow::Ok(())
        };
        if let Err(err) = write.await {
            warn!(path = %path.display(), error = %err, "file cache write failed");
        }
    }

    fn read_store_tier(&self, hash: &str) -> Option<CacheEntry> {
        let store = self.store.as_ref()?;
        match store.get_cache(hash) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).ok(),
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "store cache read failed");
                None
            }
        }
    }

    async fn cleanup_file_tier(&self) -> usize {
        let mut removed = 0usize;
        let Ok(mut shards) = tokio::fs::read_dir(&self.dir).await else {
            return 0;
        };
        while let Ok(Some(shard)) = shards.next_entry().await {
            if !shard.path().is_dir() {
                continue;
            }
            let Ok(mut files) = tokio::fs::read_dir(shard.path()).await else {
                continue;
            };
            while let Ok(Some(file)) = files.next_entry().await {
                let path = file.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let expired = match tokio::fs::read(&path).await {
                    Ok(raw) => serde_json::from_slice::<CacheEntry>(&raw)
                        .map(|e| e.is_expired())
                        .unwrap_or(false),
                    Err(_) => false,
                };
                if expired && tokio::fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }

    async fn count_file_tier(&self) -> usize {
        let mut count = 0usize;
        let Ok(mut shards) = tokio::fs::read_dir(&self.dir).await else {
            return 0;
        };
        while let Ok(Some(shard)) = shards.next_entry().await {
            if !shard.path().is_dir() {
                continue;
            }
            let Ok(mut files) = tokio::fs::read_dir(shard.path()).await else {
                continue;
            };
            while let Ok(Some(_)) = files.next_entry().await {
                count += 1;
            }
        }
        count
    }

    fn record_hit(&self) {
        self.counters.lock().expect("cache lock poisoned").hits += 1;
    }

    fn record_miss(&self) {
        self.counters.lock().expect("cache lock poisoned").misses += 1;
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("dir", &self.dir)
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
