//! In-process cache backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{CacheKey, RateCache};
use crate::providers::RateSnapshot;

/// HashMap-backed cache. Writes to the same key serialize on the lock, so
/// concurrent misses resolve last-writer-wins.
pub struct MemoryCache {
    inner: Arc<Mutex<HashMap<String, RateSnapshot>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<RateSnapshot> {
        let cache = self.inner.lock().await;
        let value = cache.get(&key.storage_key()).cloned();
        if value.is_some() {
            debug!(key = %key.storage_key(), "cache HIT");
        } else {
            debug!(key = %key.storage_key(), "cache MISS");
        }
        value
    }

    async fn put(&self, key: &CacheKey, snapshot: &RateSnapshot) {
        let mut cache = self.inner.lock().await;
        debug!(key = %key.storage_key(), "cache PUT");
        cache.insert(key.storage_key(), snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DateBucket;
    use chrono::NaiveDate;
    use futures::FutureExt;
    use rust_decimal_macros::dec;

    fn snapshot(timestamp: i64) -> RateSnapshot {
        RateSnapshot {
            base: "usd".to_string(),
            timestamp,
            rates: HashMap::from([("eur".to_string(), dec!(0.7564))]),
        }
    }

    fn key(date: (i32, u32, u32)) -> CacheKey {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        CacheKey::new("open_exchange_rates", DateBucket::Historical(date))
    }

    #[tokio::test]
    async fn get_and_put() {
        let cache = MemoryCache::new();
        let key = key((2011, 9, 9));

        assert!(cache.get(&key).await.is_none());
        cache.put(&key, &snapshot(1)).await;
        assert_eq!(cache.get(&key).await, Some(snapshot(1)));
    }

    #[tokio::test]
    async fn overwrites_on_refetch() {
        let cache = MemoryCache::new();
        let key = key((2011, 9, 9));

        cache.put(&key, &snapshot(1)).await;
        cache.put(&key, &snapshot(2)).await;
        assert_eq!(cache.get(&key).await.unwrap().timestamp, 2);
    }

    #[tokio::test]
    async fn fetch_or_compute_skips_compute_on_hit() {
        let cache = MemoryCache::new();
        let key = key((2011, 9, 9));

        let first = cache
            .fetch_or_compute(&key, async { Ok(snapshot(1)) }.boxed())
            .await
            .unwrap();
        assert_eq!(first.timestamp, 1);

        // Hit: the compute future must not run.
        let second = cache
            .fetch_or_compute(&key, async { panic!("must not compute") }.boxed())
            .await
            .unwrap();
        assert_eq!(second.timestamp, 1);
    }

    #[tokio::test]
    async fn distinct_buckets_do_not_collide() {
        let cache = MemoryCache::new();
        cache.put(&key((2011, 9, 9)), &snapshot(1)).await;
        assert!(cache.get(&key((2011, 9, 10))).await.is_none());
    }
}
