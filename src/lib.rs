//! Decimal-exact, currency-aware money values with remote exchange rates.
//!
//! A [`Money`] combines an exact decimal amount, a currency and an as-of
//! time. Conversions pull a [`providers::RateSnapshot`] through the
//! [`Fetcher`], which handles per-provider retry, the fallback chain and the
//! rate cache, then round at the target currency's minor-unit precision.
//!
//! ```no_run
//! use cambist::{CambistConfig, Fetcher, Money};
//! use rust_decimal::Decimal;
//!
//! # async fn demo() -> Result<(), cambist::Error> {
//! let config = CambistConfig::default();
//! let fetcher = Fetcher::from_config(&config)?;
//!
//! let price = Money::new(Decimal::from(78), "eur", fetcher.registry())?;
//! let in_dollars = price.convert("usd", &fetcher, None).await?;
//! println!("{}", in_dollars.format(fetcher.registry(), Default::default())?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod log;
pub mod money;
pub mod precision;
pub mod providers;
pub mod registry;

pub use config::CambistConfig;
pub use error::{Error, ProviderError};
pub use fetcher::Fetcher;
pub use money::Money;
pub use precision::{Format, RoundingMode};
pub use registry::CurrencyRegistry;
