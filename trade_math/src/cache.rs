//! Time-bounded result cache
//!
//! Results are stored as `Arc<dyn Any + Send + Sync>` under a deterministic
//! string key. A hit hands back the same `Arc`, so repeated calls with equal
//! arguments return the same allocation until the entry expires or the cache
//! is cleared.
//!
//! The store sits behind the [`CacheStore`] trait so that components can share
//! one instance, and expiry reads time through [`Clock`] so tests can drive it.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

/// Type-erased cached result
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Source of the current time for expiry checks
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Key/value store for memoized results
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Look up a live entry; `None` on miss or expiry
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Insert or overwrite an entry
    fn set(&self, key: String, value: CachedValue);

    /// Remove a single entry
    fn remove(&self, key: &str) -> Option<CachedValue>;

    /// Evict everything
    fn clear(&self);

    /// Number of stored entries, expired or not
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory cache with a fixed time-to-live per entry
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    /// Cache on the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Cache on a caller-supplied clock
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Time-to-live applied to new entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

impl CacheStore for TtlCache {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(Arc::clone(&entry.value)),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have refreshed the entry in between.
        if let Some(entry) = entries.get(key) {
            if entry.is_live(now) {
                return Some(Arc::clone(&entry.value));
            }
            entries.remove(key);
            debug!(key, "cache entry expired");
        }
        None
    }

    fn set(&self, key: String, value: CachedValue) {
        let expires_at = self.clock.now().checked_add(self.ttl);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, CacheEntry { value, expires_at });
    }

    fn remove(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).map(|entry| entry.value)
    }

    fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let evicted = entries.len();
        entries.clear();
        debug!(evicted, "cache cleared");
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Fetch a typed entry; a value stored under a different type counts as a miss
pub fn get_typed<T>(store: &dyn CacheStore, key: &str) -> Option<Arc<T>>
where
    T: Any + Send + Sync,
{
    store.get(key).and_then(|value| value.downcast::<T>().ok())
}

/// Return the cached result for `key`, computing and storing it on a miss
///
/// Errors are returned to the caller and never stored. Two threads missing on
/// the same key both compute; the later `set` wins.
pub fn memoize<T, E, F>(store: &dyn CacheStore, key: &CacheKey, compute: F) -> Result<Arc<T>, E>
where
    T: Any + Send + Sync,
    F: FnOnce() -> Result<T, E>,
{
    if let Some(hit) = get_typed::<T>(store, key.as_str()) {
        debug!(key = key.as_str(), "cache hit");
        return Ok(hit);
    }

    debug!(key = key.as_str(), "cache miss");
    let value = Arc::new(compute()?);
    store.set(key.as_str().to_string(), value.clone());
    Ok(value)
}

/// Deterministic cache key built from an operation name and its inputs
///
/// Series are folded to `len` plus a hash of their bit patterns; scalar
/// parameters are written out verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str) -> Self {
        Self(operation.to_string())
    }

    /// Append a numeric series
    pub fn series(mut self, values: &[f64]) -> Self {
        let mut hasher = DefaultHasher::new();
        for v in values {
            v.to_bits().hash(&mut hasher);
        }
        self.0
            .push_str(&format!(":{}#{:016x}", values.len(), hasher.finish()));
        self
    }

    /// Append a matrix, row by row
    pub fn matrix(mut self, rows: &[Vec<f64>]) -> Self {
        let mut hasher = DefaultHasher::new();
        for row in rows {
            row.len().hash(&mut hasher);
            for v in row {
                v.to_bits().hash(&mut hasher);
            }
        }
        self.0
            .push_str(&format!(":{}x#{:016x}", rows.len(), hasher.finish()));
        self
    }

    /// Append a named parameter
    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.0.push_str(&format!(":{}={}", name, value));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_cache(ttl_secs: u64) -> (TtlCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(Duration::from_secs(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_hit_returns_same_allocation() {
        let (cache, _) = manual_cache(60);
        let key = CacheKey::new("op").series(&[1.0, 2.0]);

        let first = memoize::<Vec<f64>, (), _>(&cache, &key, || Ok(vec![1.0])).unwrap();
        let second =
            memoize::<Vec<f64>, (), _>(&cache, &key, || panic!("should not recompute")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_entries_expire() {
        let (cache, clock) = manual_cache(10);
        cache.set("k".to_string(), Arc::new(5_u32));
        assert!(get_typed::<u32>(&cache, "k").is_some());

        clock.advance(Duration::from_secs(11));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let (cache, clock) = manual_cache(u64::MAX);
        cache.set("k".to_string(), Arc::new(1_u8));
        clock.advance(Duration::from_secs(86_400 * 365));

        assert!(cache.get("k").is_some());
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_purge_and_clear() {
        let (cache, clock) = manual_cache(10);
        cache.set("a".to_string(), Arc::new(1_u8));
        clock.advance(Duration::from_secs(5));
        cache.set("b".to_string(), Arc::new(2_u8));
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let (cache, _) = manual_cache(60);
        let key = CacheKey::new("fails");
        let result = memoize::<f64, &str, _>(&cache, &key, || Err("boom"));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let (cache, _) = manual_cache(60);
        cache.set("k".to_string(), Arc::new(1.0_f64));
        assert!(get_typed::<String>(&cache, "k").is_none());
    }

    #[test]
    fn test_keys_are_deterministic() {
        let a = CacheKey::new("var").series(&[0.1, 0.2]).param("c", 0.95);
        let b = CacheKey::new("var").series(&[0.1, 0.2]).param("c", 0.95);
        let c = CacheKey::new("var").series(&[0.1, 0.3]).param("c", 0.95);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("var:2#"));
    }
}
