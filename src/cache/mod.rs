//! Pluggable rate-snapshot cache.
//!
//! The fetcher only depends on the [`RateCache`] capability; backends are
//! swappable without touching its logic. Keys combine a provider identity
//! with a date bucket. "Latest" storage keys embed the current calendar day,
//! so a latest entry is revalidated once per day without any explicit TTL.

pub mod disk;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{Error, ProviderError};
use crate::providers::RateSnapshot;

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// Cache-key granularity for a rate snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateBucket {
    Latest,
    Historical(NaiveDate),
}

impl DateBucket {
    /// Buckets a requested as-of time: absent times and times on the current
    /// calendar day (same year and day-of-year) are "latest".
    pub fn for_time(at: Option<DateTime<Utc>>) -> Self {
        match at {
            None => DateBucket::Latest,
            Some(time) => {
                let now = Utc::now();
                if time.year() == now.year() && time.ordinal() == now.ordinal() {
                    DateBucket::Latest
                } else {
                    DateBucket::Historical(time.date_naive())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: String,
    pub bucket: DateBucket,
}

impl CacheKey {
    pub fn new(provider: &str, bucket: DateBucket) -> Self {
        Self {
            provider: provider.to_string(),
            bucket,
        }
    }

    /// The backend storage key. Latest keys roll over at midnight UTC.
    pub fn storage_key(&self) -> String {
        match &self.bucket {
            DateBucket::Historical(date) => format!("{}:{}", self.provider, date),
            DateBucket::Latest => {
                format!("{}:latest:{}", self.provider, Utc::now().date_naive())
            }
        }
    }
}

pub type ComputeFuture<'a> = BoxFuture<'a, Result<RateSnapshot, ProviderError>>;

/// Key-value capability the fetcher builds on. Backends own the snapshot
/// serialization; it must round-trip every snapshot value exactly, including
/// arbitrary-precision decimals.
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<RateSnapshot>;

    async fn put(&self, key: &CacheKey, snapshot: &RateSnapshot);

    /// Returns the cached snapshot for `key` if present; otherwise awaits
    /// `compute`, stores a successful result, and returns it. Failures are
    /// not cached.
    async fn fetch_or_compute<'a>(
        &self,
        key: &CacheKey,
        compute: ComputeFuture<'a>,
    ) -> Result<RateSnapshot, ProviderError> {
        if let Some(snapshot) = self.get(key).await {
            return Ok(snapshot);
        }
        let snapshot = compute.await?;
        self.put(key, &snapshot).await;
        Ok(snapshot)
    }
}

/// Backend that never stores anything, so every lookup computes.
pub struct NoCache;

#[async_trait]
impl RateCache for NoCache {
    async fn get(&self, _key: &CacheKey) -> Option<RateSnapshot> {
        None
    }

    async fn put(&self, key: &CacheKey, _snapshot: &RateSnapshot) {
        debug!(key = %key.storage_key(), "no-op cache, dropping snapshot");
    }
}

/// Recognized cache backend identifiers, resolved at configuration time.
pub const NO_CACHE: &str = "no_cache";
pub const MEMORY: &str = "memory";
pub const DISK: &str = "disk";

pub const BACKENDS: &[&str] = &[NO_CACHE, MEMORY, DISK];

/// Static backend table. Unrecognized identifiers fail fast.
pub fn build_cache(
    backend: &str,
    path: Option<&std::path::Path>,
) -> Result<std::sync::Arc<dyn RateCache>, Error> {
    match backend {
        NO_CACHE => Ok(std::sync::Arc::new(NoCache)),
        MEMORY => Ok(std::sync::Arc::new(MemoryCache::new())),
        DISK => {
            let path = path.ok_or_else(|| {
                Error::Config("disk cache backend requires a path".to_string())
            })?;
            Ok(std::sync::Arc::new(DiskCache::open(path)?))
        }
        other => Err(Error::Config(format!("unknown cache backend: {other}"))),
    }
}
