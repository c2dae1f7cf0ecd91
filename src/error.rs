//! Error taxonomy for the crate.
//!
//! `ProviderError` covers a single provider call; the fetcher recovers from
//! those locally via retry and fallback. Everything the caller can observe
//! surfaces as an [`Error`].

use thiserror::Error;

/// A single rate-provider call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Non-2xx response. Transient: the fetcher retries these against the
    /// same provider until its attempt budget runs out.
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Connection-level failure (refused, reset, timeout). Aborts the
    /// provider immediately without consuming the retry budget.
    #[error("connection failure: {detail}")]
    Connection { detail: String },

    /// 2xx response with an empty body. Fatal for the provider.
    #[error("blank response from {url}")]
    BlankResponse { url: String },

    /// Response body could not be parsed into a rate snapshot.
    #[error("unparseable response from {url}: {detail}")]
    Parse { url: String, detail: String },

    /// Snapshot parsed but has no usable entry for the request.
    #[error("no rate available: {detail}")]
    MissingRate { detail: String },
}

impl ProviderError {
    /// Transient failures are retried against the same provider; everything
    /// else cascades straight to the next fallback.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::HttpStatus { .. })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is not a currency nor a country code matchable to a currency")]
    UnknownCurrency(String),

    #[error("cannot combine {left} with {right} without an explicit conversion")]
    CurrencyMismatch { left: String, right: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every configured provider was exhausted.
    #[error("exchange rate unavailable, all providers exhausted: {providers}")]
    RateUnavailable { providers: String },

    #[error("{0} is not a parseable amount")]
    InvalidAmount(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("amount out of range for decimal arithmetic")]
    Overflow,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache backend error: {0}")]
    Cache(String),
}
