//! Persistent cache backend on a fjall keyspace.
//!
//! Snapshots are stored as JSON; `rust_decimal` serializes decimals as
//! strings, so rates round-trip without precision loss. Backend failures
//! degrade to a cache miss rather than surfacing to the fetcher.

use std::path::Path;

use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::debug;

use crate::cache::{CacheKey, RateCache};
use crate::error::Error;
use crate::providers::RateSnapshot;

pub struct DiskCache {
    partition: PartitionHandle,
    _keyspace: Keyspace,
}

impl DiskCache {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(|e| Error::Cache(format!("failed to open keyspace: {e}")))?;
        let partition = keyspace
            .open_partition("rates", PartitionCreateOptions::default())
            .map_err(|e| Error::Cache(format!("failed to open partition: {e}")))?;
        Ok(Self {
            partition,
            _keyspace: keyspace,
        })
    }
}

#[async_trait]
impl RateCache for DiskCache {
    async fn get(&self, key: &CacheKey) -> Option<RateSnapshot> {
        let storage_key = key.storage_key();
        match self.partition.get(&storage_key) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(snapshot) => {
                    debug!(key = %storage_key, "cache HIT");
                    Some(snapshot)
                }
                Err(e) => {
                    debug!(key = %storage_key, error = %e, "undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %storage_key, "cache MISS");
                None
            }
            Err(e) => {
                debug!(key = %storage_key, error = %e, "cache read error");
                None
            }
        }
    }

    async fn put(&self, key: &CacheKey, snapshot: &RateSnapshot) {
        let storage_key = key.storage_key();
        let encoded = match serde_json::to_vec(snapshot) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!(key = %storage_key, error = %e, "cache encode error");
                return;
            }
        };
        match self.partition.insert(&storage_key, encoded) {
            Ok(()) => debug!(key = %storage_key, "cache PUT"),
            Err(e) => debug!(key = %storage_key, error = %e, "cache write error"),
        }
    }
}
