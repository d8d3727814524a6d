use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

const MAX_TTL_SECS: u64 = 366 * 24 * 60 * 60;

/// Keyed store for computed results, owned by whoever orchestrates engine
/// calls. Time is always supplied by the caller.
pub trait SnapshotCache<V> {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&V>;
    fn insert(&mut self, key: String, value: V, now: DateTime<Utc>);
    fn invalidate(&mut self, key: &str) -> bool;
    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize;
}

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self::new(Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> SnapshotCache<V> for TtlCache<V> {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&V> {
        self.entries.get(key).filter(|entry| now < entry.expires_at).map(|entry| &entry.value)
    }

    fn insert(&mut self, key: String, value: V, now: DateTime<Utc>) {
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{SnapshotCache, TtlCache};

    #[test]
    fn entries_expire_after_ttl() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).single().expect("valid time");
        let mut cache = TtlCache::with_ttl_secs(300);

        cache.insert("abc".to_string(), 7, start);
        assert_eq!(cache.get("abc", start + Duration::seconds(299)), Some(&7));
        assert_eq!(cache.get("abc", start + Duration::seconds(300)), None);
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.purge_expired(start + Duration::seconds(301)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_removes_a_single_key() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).single().expect("valid time");
        let mut cache = TtlCache::new(Duration::minutes(5));
        cache.insert("a".to_string(), "first", now);
        cache.insert("b".to_string(), "second", now);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.get("b", now), Some(&"second"));
    }

    #[test]
    fn oversized_ttl_is_capped_to_a_year() {
        let cache: TtlCache<u8> = TtlCache::with_ttl_secs(u64::MAX);
        assert_eq!(cache.ttl(), Duration::days(366));

        let far_future = Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).single().expect("valid time");
        let mut cache = cache;
        cache.insert("late".to_string(), 1, far_future);
        assert_eq!(cache.get("late", far_future), Some(&1));
    }
}
