//! Thread-safe LRU cache for synthesis results.
//!
//! Keys quantize their numeric parameter before storage so equality and
//! hashing always agree: two raw speeds within half a quantum land on the
//! same key, anything further apart lands on distinct keys. Payloads are
//! exchanged as deep copies in both directions; callers can never alias
//! cache-internal storage.

use crate::logging::{Logger, Severity, stderr_logger};
use crate::tts::synthesizer::TtsResult;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Sentinel index for absent links in the intrusive LRU list.
const NIL: usize = usize::MAX;

/// Immutable memoization key: (text, speed quantized to milli-units,
/// speaker id).
///
/// The quantized integer participates in both `Eq` and `Hash`, which keeps
/// the two consistent. The classic pitfall of comparing raw floats within
/// an epsilon while hashing them raw cannot occur.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    speed_millis: i32,
    speaker_id: i32,
}

impl CacheKey {
    pub fn new(text: &str, speed: f32, speaker_id: i32) -> Self {
        Self {
            text: text.to_string(),
            speed_millis: (speed * 1000.0).round() as i32,
            speaker_id,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Speed after quantization to three decimals.
    pub fn speed(&self) -> f32 {
        self.speed_millis as f32 / 1000.0
    }

    pub fn speaker_id(&self) -> i32 {
        self.speaker_id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{:.3}] {}", self.speaker_id, self.speed(), self.text)
    }
}

struct Entry {
    key: CacheKey,
    samples: Vec<f32>,
    sample_rate: u32,
    prev: usize,
    next: usize,
}

struct CacheInner {
    map: HashMap<CacheKey, usize>,
    slots: Vec<Entry>,
    free: Vec<usize>,
    /// Most recently used.
    head: usize,
    /// Least recently used.
    tail: usize,
    max_size: usize,
}

impl CacheInner {
    fn detach(&mut self, idx: usize) {
        let prev = self.slots[idx].prev;
        let next = self.slots[idx].next;

        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn evict_lru(&mut self) {
        let idx = self.tail;
        if idx == NIL {
            return;
        }
        self.detach(idx);

        let key = self.slots[idx].key.clone();
        // Free the payload now; the slot itself is recycled on insert.
        self.slots[idx].samples = Vec::new();
        self.map.remove(&key);
        self.free.push(idx);
    }
}

/// Thread-safe LRU cache memoizing [`TtsResult`]s.
pub struct TtsResultCache {
    inner: Mutex<CacheInner>,
    logger: Logger,
}

impl TtsResultCache {
    /// Creates a cache holding at most `max_size` entries (minimum 1).
    pub fn new(max_size: usize) -> Self {
        Self::with_logger(max_size, stderr_logger())
    }

    pub fn with_logger(max_size: usize, logger: Logger) -> Self {
        let max_size = max_size.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::with_capacity(max_size),
                slots: Vec::new(),
                free: Vec::new(),
                head: NIL,
                tail: NIL,
                max_size,
            }),
            logger,
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum cache capacity.
    pub fn max_size(&self) -> usize {
        self.inner.lock().map(|inner| inner.max_size).unwrap_or(0)
    }

    /// Changes capacity. Shrinking evicts LRU entries immediately; growing
    /// only raises the bound.
    pub fn set_max_size(&self, max_size: usize) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.max_size = max_size.max(1);
        while inner.map.len() > inner.max_size {
            inner.evict_lru();
        }
    }

    /// Returns a deep copy of the stored result and promotes the entry to
    /// most-recently-used. `None` on miss.
    pub fn try_get(&self, key: &CacheKey) -> Option<TtsResult> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let idx = *inner.map.get(key)?;

        inner.detach(idx);
        inner.push_front(idx);

        Some(TtsResult::new(
            inner.slots[idx].samples.clone(),
            inner.slots[idx].sample_rate,
        ))
    }

    /// Stores a deep copy of `result` under `key`.
    ///
    /// Invalid results are rejected as a no-op. An existing key is replaced
    /// and promoted; a new key evicts least-recently-used entries while the
    /// cache is at or above capacity, then inserts at the head.
    pub fn add(&self, key: CacheKey, result: &TtsResult) {
        if !result.is_valid() {
            return;
        }

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        if let Some(&idx) = inner.map.get(&key) {
            inner.slots[idx].samples = result.samples.clone();
            inner.slots[idx].sample_rate = result.sample_rate;
            inner.detach(idx);
            inner.push_front(idx);
            return;
        }

        while inner.map.len() >= inner.max_size {
            inner.evict_lru();
        }

        let entry = Entry {
            key: key.clone(),
            samples: result.samples.clone(),
            sample_rate: result.sample_rate,
            prev: NIL,
            next: NIL,
        };

        let idx = match inner.free.pop() {
            Some(idx) => {
                inner.slots[idx] = entry;
                idx
            }
            None => {
                inner.slots.push(entry);
                inner.slots.len() - 1
            }
        };
        inner.map.insert(key, idx);
        inner.push_front(idx);
    }

    /// Drops all entries.
    pub fn clear(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.map.clear();
        inner.slots.clear();
        inner.free.clear();
        inner.head = NIL;
        inner.tail = NIL;
        drop(inner);

        self.logger.emit(Severity::Debug, "tts result cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NullSink;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::sync::Arc;

    fn cache(max_size: usize) -> TtsResultCache {
        TtsResultCache::with_logger(max_size, Arc::new(NullSink))
    }

    fn result(value: f32) -> TtsResult {
        TtsResult::new(vec![value; 100], 22050)
    }

    fn hash_of(key: &CacheKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_key_sub_quantum_difference_is_equal() {
        let a = CacheKey::new("hi", 1.0000, 0);
        let b = CacheKey::new("hi", 1.0004, 0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_key_full_quantum_difference_is_distinct() {
        let a = CacheKey::new("hi", 1.0000, 0);
        let b = CacheKey::new("hi", 1.0010, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_differs_by_text_and_speaker() {
        let base = CacheKey::new("hi", 1.0, 0);
        assert_ne!(base, CacheKey::new("hello", 1.0, 0));
        assert_ne!(base, CacheKey::new("hi", 1.0, 1));
    }

    #[test]
    fn test_key_display() {
        let key = CacheKey::new("hello", 1.25, 3);
        assert_eq!(key.to_string(), "[3|1.250] hello");
    }

    #[test]
    fn test_miss_returns_none() {
        let cache = cache(4);
        assert!(cache.try_get(&CacheKey::new("hi", 1.0, 0)).is_none());
    }

    #[test]
    fn test_hit_returns_stored_payload() {
        let cache = cache(4);
        let key = CacheKey::new("hi", 1.0, 0);
        cache.add(key.clone(), &result(0.5));

        let hit = cache.try_get(&key).unwrap();
        assert_eq!(hit.samples, vec![0.5; 100]);
        assert_eq!(hit.sample_rate, 22050);
    }

    #[test]
    fn test_hit_through_equivalent_key() {
        let cache = cache(4);
        cache.add(CacheKey::new("hi", 1.0000, 0), &result(0.5));

        assert!(cache.try_get(&CacheKey::new("hi", 1.0004, 0)).is_some());
        assert!(cache.try_get(&CacheKey::new("hi", 1.0010, 0)).is_none());
    }

    #[test]
    fn test_invalid_result_is_rejected() {
        let cache = cache(4);
        cache.add(CacheKey::new("hi", 1.0, 0), &TtsResult::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_copy_isolation() {
        let cache = cache(4);
        let key = CacheKey::new("hi", 1.0, 0);
        cache.add(key.clone(), &result(0.5));

        let mut first = cache.try_get(&key).unwrap();
        first.samples[0] = 99.0;

        let second = cache.try_get(&key).unwrap();
        assert_eq!(second.samples[0], 0.5);
    }

    #[test]
    fn test_lru_eviction_on_overflow() {
        let cache = cache(3);
        for i in 0..3 {
            cache.add(CacheKey::new(&format!("t{}", i), 1.0, 0), &result(0.1));
        }

        // Insert a 4th entry: t0 is the least recently touched.
        cache.add(CacheKey::new("t3", 1.0, 0), &result(0.1));

        assert_eq!(cache.len(), 3);
        assert!(cache.try_get(&CacheKey::new("t0", 1.0, 0)).is_none());
        assert!(cache.try_get(&CacheKey::new("t1", 1.0, 0)).is_some());
        assert!(cache.try_get(&CacheKey::new("t3", 1.0, 0)).is_some());
    }

    #[test]
    fn test_hit_protects_from_eviction() {
        let cache = cache(3);
        for i in 0..3 {
            cache.add(CacheKey::new(&format!("t{}", i), 1.0, 0), &result(0.1));
        }

        // Touch the oldest entry before overflowing.
        assert!(cache.try_get(&CacheKey::new("t0", 1.0, 0)).is_some());
        cache.add(CacheKey::new("t3", 1.0, 0), &result(0.1));

        assert!(cache.try_get(&CacheKey::new("t0", 1.0, 0)).is_some());
        assert!(cache.try_get(&CacheKey::new("t1", 1.0, 0)).is_none());
    }

    #[test]
    fn test_replace_existing_key_promotes() {
        let cache = cache(2);
        cache.add(CacheKey::new("a", 1.0, 0), &result(0.1));
        cache.add(CacheKey::new("b", 1.0, 0), &result(0.2));

        // Replace "a": it becomes most recent, so "b" evicts next.
        cache.add(CacheKey::new("a", 1.0, 0), &result(0.3));
        cache.add(CacheKey::new("c", 1.0, 0), &result(0.4));

        let hit = cache.try_get(&CacheKey::new("a", 1.0, 0)).unwrap();
        assert_eq!(hit.samples[0], 0.3);
        assert!(cache.try_get(&CacheKey::new("b", 1.0, 0)).is_none());
    }

    #[test]
    fn test_shrink_evicts_immediately() {
        let cache = cache(4);
        for i in 0..4 {
            cache.add(CacheKey::new(&format!("t{}", i), 1.0, 0), &result(0.1));
        }

        cache.set_max_size(2);

        assert_eq!(cache.len(), 2);
        assert!(cache.try_get(&CacheKey::new("t3", 1.0, 0)).is_some());
        assert!(cache.try_get(&CacheKey::new("t0", 1.0, 0)).is_none());
    }

    #[test]
    fn test_grow_has_no_immediate_effect() {
        let cache = cache(2);
        cache.add(CacheKey::new("a", 1.0, 0), &result(0.1));
        cache.add(CacheKey::new("b", 1.0, 0), &result(0.2));

        cache.set_max_size(5);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.max_size(), 5);
        cache.add(CacheKey::new("c", 1.0, 0), &result(0.3));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = cache(4);
        cache.add(CacheKey::new("a", 1.0, 0), &result(0.1));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.try_get(&CacheKey::new("a", 1.0, 0)).is_none());

        // Reusable after clearing.
        cache.add(CacheKey::new("b", 1.0, 0), &result(0.2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_minimum_is_one() {
        let cache = cache(0);
        assert_eq!(cache.max_size(), 1);
        cache.add(CacheKey::new("a", 1.0, 0), &result(0.1));
        cache.add(CacheKey::new("b", 1.0, 0), &result(0.2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_slot_reuse_after_eviction() {
        let cache = cache(2);
        for i in 0..10 {
            cache.add(CacheKey::new(&format!("t{}", i), 1.0, 0), &result(0.1));
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.try_get(&CacheKey::new("t9", 1.0, 0)).is_some());
        assert!(cache.try_get(&CacheKey::new("t8", 1.0, 0)).is_some());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(cache(8));
        let mut joins = Vec::new();

        for t in 0..4 {
            let cache = Arc::clone(&cache);
            joins.push(std::thread::spawn(move || {
                for i in 0..50 {
                    let key = CacheKey::new(&format!("t{}", i % 10), 1.0, t);
                    cache.add(key.clone(), &result(0.1));
                    let _ = cache.try_get(&key);
                }
            }));
        }
        for join in joins {
            join.join().unwrap();
        }

        assert!(cache.len() <= 8);
    }
}
