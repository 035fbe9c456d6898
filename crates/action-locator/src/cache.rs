use std::time::Duration;

use dashmap::DashMap;
use rapidtap_core_types::{Bounds, PatternId, StrategyKind};
use tokio::time::Instant;

use crate::ports::ElementRef;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub pattern: PatternId,
    pub strategy: StrategyKind,
}

impl CacheKey {
    pub fn new(pattern: PatternId, strategy: StrategyKind) -> Self {
        Self { pattern, strategy }
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub element: ElementRef,
    pub bounds: Bounds,
    pub captured_at: Instant,
}

impl CacheEntry {
    pub fn new(element: ElementRef, bounds: Bounds) -> Self {
        Self {
            element,
            bounds,
            captured_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

/// Located elements keyed by pattern and strategy.
///
/// Expired entries are never returned but stay in the map until the next
/// `clear`.
#[derive(Default)]
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn put(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| entry.age() < self.ttl)
            .map(|entry| entry.value().clone())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StaticElement;
    use std::sync::Arc;

    fn key(id: &str) -> CacheKey {
        CacheKey::new(PatternId::new(id), StrategyKind::Normal)
    }

    fn entry() -> CacheEntry {
        let element = Arc::new(StaticElement::new("btn").with_bounds(Bounds::new(0, 0, 10, 10)));
        CacheEntry::new(element, Bounds::new(0, 0, 10, 10))
    }

    #[tokio::test(start_paused = true)]
    async fn put_then_get_within_ttl() {
        let cache = ResultCache::new(Duration::from_millis(2_000));
        cache.put(key("a"), entry());
        tokio::time::advance(Duration::from_millis(1_999)).await;
        let hit = cache.get(&key("a")).expect("fresh entry");
        assert_eq!(hit.bounds, Bounds::new(0, 0, 10, 10));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_absent_but_retained() {
        let cache = ResultCache::new(Duration::from_millis(2_000));
        cache.put(key("a"), entry());
        tokio::time::advance(Duration::from_millis(2_000)).await;
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_scoped_by_strategy() {
        let cache = ResultCache::new(Duration::from_millis(2_000));
        cache.put(key("a"), entry());
        let turbo = CacheKey::new(PatternId::new("a"), StrategyKind::Turbo);
        assert!(cache.get(&turbo).is_none());
        assert!(cache.get(&key("a")).is_some());
    }
}
