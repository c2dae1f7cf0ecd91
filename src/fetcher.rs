//! Rate lookup orchestration: cache first, then the configured provider
//! chain with a bounded retry budget per provider.
//!
//! Non-2xx statuses are transient and retried against the same provider
//! immediately. Connection failures, timeouts, blank bodies and parse
//! failures abort the provider without consuming its budget. An exhausted
//! provider cascades to the next fallback; when every provider is exhausted
//! the lookup fails terminally.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, DateBucket, RateCache, build_cache};
use crate::config::CambistConfig;
use crate::error::{Error, ProviderError};
use crate::providers::{RateProvider, RateSnapshot, build_provider, default_base_url};
use crate::registry::CurrencyRegistry;

pub struct Fetcher {
    registry: Arc<CurrencyRegistry>,
    cache: Arc<dyn RateCache>,
    providers: Vec<Arc<dyn RateProvider>>,
    retries: u32,
}

impl Fetcher {
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        cache: Arc<dyn RateCache>,
        providers: Vec<Arc<dyn RateProvider>>,
        retries: u32,
    ) -> Self {
        Self {
            registry,
            cache,
            providers,
            retries,
        }
    }

    /// Wires a fetcher from configuration: freshly loaded reference data, the
    /// selected cache backend, and the primary-plus-fallback provider chain.
    pub fn from_config(config: &CambistConfig) -> Result<Self, Error> {
        let registry = Arc::new(CurrencyRegistry::load()?);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(
        config: &CambistConfig,
        registry: Arc<CurrencyRegistry>,
    ) -> Result<Self, Error> {
        let cache = build_cache(
            &config.cache.backend,
            config.cache.path.as_deref().map(Path::new),
        )?;
        let timeout = Duration::from_secs(config.api.timeout_secs);
        let app_id = config.api.app_id.clone().unwrap_or_default();
        let scheme = config.api.protocol.scheme();

        let mut providers = Vec::new();
        for id in config.api.provider_chain() {
            let base_url = config
                .api
                .base_url_for(&id)
                .map(str::to_string)
                .or_else(|| default_base_url(&id, scheme))
                .unwrap_or_default();
            providers.push(build_provider(&id, &base_url, &app_id, timeout, &registry)?);
        }

        Ok(Self::new(registry, cache, providers, config.api.retries))
    }

    pub fn registry(&self) -> &Arc<CurrencyRegistry> {
        &self.registry
    }

    /// One logical rate lookup. Served from cache when possible; a fresh
    /// fetch is written through the cache before being returned, so the next
    /// request for the same provider and date bucket stays off the network.
    #[instrument(name = "RateLookup", skip(self), fields(at = ?at))]
    pub async fn snapshot(&self, at: Option<DateTime<Utc>>) -> Result<RateSnapshot, Error> {
        let bucket = DateBucket::for_time(at);
        let mut tried = Vec::new();

        for provider in &self.providers {
            tried.push(provider.id());
            let key = CacheKey::new(provider.id(), bucket.clone());
            let compute = self.call_with_retry(provider.as_ref(), at).boxed();
            match self.cache.fetch_or_compute(&key, compute).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) => {
                    warn!(provider = provider.id(), error = %err, "provider exhausted, falling back");
                }
            }
        }

        Err(Error::RateUnavailable {
            providers: tried.join(", "),
        })
    }

    async fn call_with_retry(
        &self,
        provider: &dyn RateProvider,
        at: Option<DateTime<Utc>>,
    ) -> Result<RateSnapshot, ProviderError> {
        let mut attempts_left = self.retries.max(1);
        loop {
            match provider.fetch(at).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if err.is_transient() => {
                    attempts_left -= 1;
                    if attempts_left == 0 {
                        return Err(err);
                    }
                    debug!(
                        provider = provider.id(),
                        error = %err,
                        attempts_left,
                        "transient failure, retrying"
                    );
                }
                Err(err) => {
                    debug!(
                        provider = provider.id(),
                        error = %err,
                        "non-transient failure, aborting provider"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// The factor that converts one unit of `from` into `to` at `at`:
    /// `rate[to] / rate[from]` against the snapshot's base.
    pub async fn rate(
        &self,
        from: &str,
        to: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Decimal, Error> {
        let snapshot = self.snapshot(at).await?;
        let from_rate = snapshot.rate(from).ok_or_else(|| {
            Error::Provider(ProviderError::MissingRate {
                detail: format!("{from} is not quoted against {}", snapshot.base),
            })
        })?;
        let to_rate = snapshot.rate(to).ok_or_else(|| {
            Error::Provider(ProviderError::MissingRate {
                detail: format!("{to} is not quoted against {}", snapshot.base),
            })
        })?;
        to_rate.checked_div(from_rate).ok_or(Error::DivisionByZero)
    }
}
