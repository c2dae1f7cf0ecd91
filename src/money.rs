//! The Money value: an exact decimal amount in a named currency, stamped
//! with the time it refers to.
//!
//! Values are immutable; every operation returns a new instance. Arithmetic
//! between two Money values requires identical currencies, and a plain
//! number is never treated as money: wrap it with a stated currency first.
//! Scalar multiplication and division keep the currency.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::Error;
use crate::fetcher::Fetcher;
use crate::precision::{self, Format};
use crate::registry::CurrencyRegistry;

#[derive(Debug, Clone)]
pub struct Money {
    amount: Decimal,
    currency: String,
    as_of: DateTime<Utc>,
}

impl Money {
    /// A money value in `currency` (a currency or country code), as of now.
    pub fn new(
        amount: Decimal,
        currency: &str,
        registry: &CurrencyRegistry,
    ) -> Result<Self, Error> {
        let currency = registry.assert_currency(currency)?;
        Ok(Self {
            amount,
            currency,
            as_of: Utc::now(),
        })
    }

    /// Builds a money value from a numeric literal (which may carry an
    /// exponent) without losing precision. The amount keeps whatever
    /// precision the literal has; only rounding operations truncate.
    pub fn from_literal(
        literal: &str,
        currency: &str,
        registry: &CurrencyRegistry,
    ) -> Result<Self, Error> {
        let currency = registry.assert_currency(currency)?;
        let amount = precision::instantiate(registry, literal, &currency)?;
        Ok(Self {
            amount,
            currency,
            as_of: Utc::now(),
        })
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), Error> {
        if self.currency != other.currency {
            return Err(Error::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }

    fn with_amount(&self, amount: Decimal) -> Money {
        Money {
            amount,
            currency: self.currency.clone(),
            as_of: self.as_of,
        }
    }

    pub fn add(&self, other: &Money) -> Result<Money, Error> {
        self.require_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(Error::Overflow)?;
        Ok(self.with_amount(amount))
    }

    pub fn sub(&self, other: &Money) -> Result<Money, Error> {
        self.require_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(Error::Overflow)?;
        Ok(self.with_amount(amount))
    }

    /// Scales by a plain number, preserving the currency.
    pub fn mul(&self, scalar: Decimal) -> Result<Money, Error> {
        let amount = self.amount.checked_mul(scalar).ok_or(Error::Overflow)?;
        Ok(self.with_amount(amount))
    }

    pub fn div(&self, scalar: Decimal) -> Result<Money, Error> {
        if scalar.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let amount = self.amount.checked_div(scalar).ok_or(Error::Overflow)?;
        Ok(self.with_amount(amount))
    }

    /// Ordering against another money value of the same currency.
    pub fn try_cmp(&self, other: &Money) -> Result<Ordering, Error> {
        self.require_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Converts into `to` using the exchange rate at `at` (default: this
    /// value's as-of time). The result is rounded at the target currency's
    /// minor-unit precision and stamped with `at`.
    pub async fn convert(
        &self,
        to: &str,
        fetcher: &Fetcher,
        at: Option<DateTime<Utc>>,
    ) -> Result<Money, Error> {
        let registry = fetcher.registry();
        let to_currency = registry.assert_currency(to)?;
        let at = at.unwrap_or(self.as_of);

        let rate = fetcher.rate(&self.currency, &to_currency, Some(at)).await?;
        let converted = self.amount.checked_mul(rate).ok_or(Error::Overflow)?;
        let amount = precision::round(registry, converted, &to_currency, None, false)?;

        Ok(Money {
            amount,
            currency: to_currency,
            as_of: at,
        })
    }

    pub fn format(&self, registry: &CurrencyRegistry, format: Format) -> Result<String, Error> {
        precision::stringify(registry, self.amount, &self.currency, format)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.currency == other.currency && self.amount == other.amount
    }
}

impl PartialOrd for Money {
    /// Cross-currency orderings are undefined rather than guessed.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.currency == other.currency).then(|| self.amount.cmp(&other.amount))
    }
}
