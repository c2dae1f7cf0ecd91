//! Deterministic provider for development and tests. Serves a configured
//! snapshot without touching the network, so conversions are reproducible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ProviderError;
use crate::providers::{RateProvider, RateSnapshot};
use crate::registry::CurrencyRegistry;

pub struct FixedRates {
    snapshot: RateSnapshot,
}

impl FixedRates {
    pub const ID: &'static str = "fixed";

    /// Unit rates for every active currency against a US dollar base. Every
    /// conversion becomes value-preserving, which is what a dev environment
    /// without provider credentials wants.
    pub fn new(registry: &CurrencyRegistry) -> Self {
        let rates = registry
            .active_definitions()
            .map(|(code, _)| (code.clone(), Decimal::ONE))
            .collect();
        Self {
            snapshot: RateSnapshot {
                base: "usd".to_string(),
                timestamp: 0,
                rates,
            },
        }
    }

    /// Serve an exact snapshot, e.g. a fixture in tests.
    pub fn with_snapshot(snapshot: RateSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl RateProvider for FixedRates {
    fn id(&self) -> &'static str {
        Self::ID
    }

    async fn fetch(&self, at: Option<DateTime<Utc>>) -> Result<RateSnapshot, ProviderError> {
        debug!(at = ?at, "serving fixed snapshot");
        Ok(self.snapshot.clone())
    }
}
