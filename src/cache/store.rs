use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::{ScoreResult, TitleQuery};
use crate::services::normalize::normalize_title;

/// Default expiry for cached scores (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key derived from a title query: `<normalized title>_<year|no_year>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_query(query: &TitleQuery) -> Self {
        let year = query
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "no_year".to_string());
        Self(format!("{}_{}", normalize_title(&query.title), year))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cached score and the moment it was stored
#[derive(Debug, Clone)]
struct CacheEntry {
    data: ScoreResult,
    stored_at: Instant,
}

impl CacheEntry {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }
}

/// Snapshot of cache contents and hit/miss counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// In-memory store of resolved scores with time-based expiry
///
/// Cloning is cheap and every clone shares the same entries. Expired entries are
/// treated as absent by `get` and only physically removed by `sweep`.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: RwLock::new(HashMap::new()),
                ttl,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the cached score for the query if present and younger than the TTL
    pub async fn get(&self, query: &TitleQuery) -> Option<ScoreResult> {
        let key = CacheKey::for_query(query);
        let now = Instant::now();

        let cached = {
            let entries = self.inner.entries.read().await;
            entries
                .get(&key)
                .filter(|entry| entry.age(now) < self.inner.ttl)
                .map(|entry| entry.data.clone())
        };

        match cached {
            Some(data) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Cache hit");
                Some(data)
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Stores a score for the query, replacing any existing entry
    pub async fn put(&self, query: &TitleQuery, result: ScoreResult) {
        let key = CacheKey::for_query(query);
        let entry = CacheEntry {
            data: result,
            stored_at: Instant::now(),
        };

        self.inner.entries.write().await.insert(key.clone(), entry);
        tracing::debug!(key = %key, ttl_secs = self.inner.ttl.as_secs(), "Cached score");
    }

    /// Removes every entry whose age has reached the TTL, returning how many were removed
    pub async fn sweep(&self) -> usize {
        self.sweep_older_than(self.inner.ttl).await
    }

    /// Removes every entry at least `max_age` old, returning how many were removed
    pub async fn sweep_older_than(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.age(now) < max_age);
        let removed = before - entries.len();

        if removed > 0 {
            tracing::info!(
                removed,
                remaining = entries.len(),
                max_age_secs = max_age.as_secs(),
                "Swept expired cache entries"
            );
        }

        removed
    }

    /// Number of stored entries, expired or not
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.inner.entries.read().await;
        let valid_entries = entries
            .values()
            .filter(|entry| entry.age(now) < self.inner.ttl)
            .count();

        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            total_entries: entries.len(),
            valid_entries,
            expired_entries: entries.len() - valid_entries,
            hits,
            misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}
