//! Remote rate providers.
//!
//! Each variant fetches a [`RateSnapshot`] for "latest" or a historical date
//! and parses it into the snapshot model, restricted to the currencies that
//! provider supports. Provider identifiers resolve through a static
//! constructor table; an unrecognized identifier is a configuration error.

pub mod ecb;
pub mod fixed;
pub mod open_exchange_rates;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ProviderError};
use crate::registry::CurrencyRegistry;

pub use ecb::Ecb;
pub use fixed::FixedRates;
pub use open_exchange_rates::OpenExchangeRates;

/// One provider fetch result: 1 unit of `base` expressed in each listed
/// currency. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base: String,
    pub timestamp: i64,
    pub rates: HashMap<String, Decimal>,
}

impl RateSnapshot {
    /// The rate for a currency; the base currency is always 1 even when the
    /// provider omits it from the table.
    pub fn rate(&self, code: &str) -> Option<Decimal> {
        self.rates
            .get(code)
            .copied()
            .or_else(|| (code == self.base).then_some(Decimal::ONE))
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// Issues one HTTP GET (no internal retry; the fetcher owns the retry
    /// budget) and parses the response into a snapshot.
    async fn fetch(&self, at: Option<DateTime<Utc>>) -> Result<RateSnapshot, ProviderError>;
}

/// Recognized provider identifiers.
pub const PROVIDERS: &[&str] = &[OpenExchangeRates::ID, Ecb::ID, FixedRates::ID];

/// Static identifier-to-constructor table, replacing any runtime name
/// resolution. Fails fast on an unrecognized identifier.
pub fn build_provider(
    id: &str,
    base_url: &str,
    app_id: &str,
    timeout: Duration,
    registry: &CurrencyRegistry,
) -> Result<Arc<dyn RateProvider>, Error> {
    match id {
        OpenExchangeRates::ID => Ok(Arc::new(OpenExchangeRates::new(
            base_url, app_id, timeout, registry,
        ))),
        Ecb::ID => Ok(Arc::new(Ecb::new(base_url, timeout, registry))),
        FixedRates::ID => Ok(Arc::new(FixedRates::new(registry))),
        other => Err(Error::Config(format!("unknown rate provider: {other}"))),
    }
}

/// The well-known endpoint host for a provider under the given scheme.
pub fn default_base_url(id: &str, scheme: &str) -> Option<String> {
    match id {
        OpenExchangeRates::ID => Some(format!("{scheme}://openexchangerates.org/api")),
        Ecb::ID => Some(format!("{scheme}://www.ecb.europa.eu")),
        _ => None,
    }
}

/// Shared GET helper: classifies connection failures, non-2xx statuses and
/// blank bodies before handing the text to the provider's parser.
pub(crate) async fn http_get_text(url: &str, timeout: Duration) -> Result<String, ProviderError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("cambist/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Connection {
            detail: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProviderError::Connection {
            detail: format!("{e} for {url}"),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await.map_err(|e| ProviderError::Connection {
        detail: format!("{e} for {url}"),
    })?;
    if body.trim().is_empty() {
        return Err(ProviderError::BlankResponse {
            url: url.to_string(),
        });
    }
    Ok(body)
}
