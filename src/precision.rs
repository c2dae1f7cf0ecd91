//! Currency-precision arithmetic: deriving a safe decimal precision from a
//! numeric literal, rounding to a currency's minor-unit count, and rendering
//! amounts as strings.
//!
//! All operations are pure functions over a [`CurrencyRegistry`]. A single
//! parameterized [`apply`] drives `round`, `ceil` and `floor` so the three
//! directions share one code path.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::Error;
use crate::registry::CurrencyRegistry;

/// Rounding direction for [`apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Half away from zero.
    Nearest,
    /// Toward positive infinity.
    Up,
    /// Toward negative infinity.
    Down,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::Nearest => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::Up => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Down => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

/// Output shape for [`stringify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Uppercase currency code prefix, e.g. `SAR 23,234,234.23`.
    #[default]
    Code,
    /// Amount with separators but no currency, e.g. `23,234,234.23`.
    Amount,
    /// Amount with no separators and no currency, e.g. `23234234.23`.
    Plain,
    /// Currency symbol prefix, falling back to the code when the currency
    /// defines no symbol.
    Symbol,
}

struct LiteralParts<'a> {
    major: &'a str,
    minor: &'a str,
    exponent: Option<i64>,
}

fn split_literal(literal: &str) -> Result<LiteralParts<'_>, Error> {
    let unsigned = literal.strip_prefix('-').unwrap_or(literal);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(idx) => {
            let exponent = unsigned[idx + 1..]
                .parse::<i64>()
                .map_err(|_| Error::InvalidAmount(literal.to_string()))?;
            (&unsigned[..idx], Some(exponent))
        }
        None => (unsigned, None),
    };
    let (major, minor) = match mantissa.split_once('.') {
        Some((major, minor)) => (major, minor),
        None => (mantissa, ""),
    };
    let all_digits = major.chars().chain(minor.chars()).all(|c| c.is_ascii_digit());
    if mantissa.is_empty() || !all_digits {
        return Err(Error::InvalidAmount(literal.to_string()));
    }
    Ok(LiteralParts {
        major,
        minor,
        exponent,
    })
}

/// The minimum total decimal precision that represents `literal` without
/// loss in `currency`: the literal's integer digit count plus the larger of
/// its (exponent-shifted) fractional digit count and the currency's defined
/// minor-unit count.
pub fn precision_for(
    registry: &CurrencyRegistry,
    literal: &str,
    currency: &str,
) -> Result<u32, Error> {
    let minor_unit = registry.minor_unit(currency)? as i64;
    let parts = split_literal(literal)?;

    let major_precision = parts.major.len() as i64;
    let minor_precision = match parts.exponent {
        Some(exponent) => {
            // A bare "0" mantissa fraction carries no precision of its own.
            let leftover = if parts.minor == "0" {
                0
            } else {
                parts.minor.len() as i64
            };
            leftover - exponent
        }
        None => parts.minor.len() as i64,
    };

    Ok((major_precision + minor_unit.max(minor_precision)) as u32)
}

/// Parses a numeric literal into an exact decimal, validating the currency.
/// The amount is not truncated to the currency's minor units; only the
/// rounding operations do that.
pub fn instantiate(
    registry: &CurrencyRegistry,
    literal: &str,
    currency: &str,
) -> Result<Decimal, Error> {
    registry.definition(currency)?;
    split_literal(literal)?;
    let parsed = if literal.contains(['e', 'E']) {
        Decimal::from_scientific(literal)
    } else {
        Decimal::from_str(literal)
    };
    parsed.map_err(|_| Error::InvalidAmount(literal.to_string()))
}

fn step(amount: Decimal, precision: u32, mode: RoundingMode) -> Decimal {
    amount.round_dp_with_strategy(precision, mode.strategy())
}

/// Applies a rounding direction to `amount`, truncating to `precision`
/// decimal digits (default: the currency's minor-unit count).
///
/// With `psych` set and a currency that has minor units, the amount is taken
/// to a whole unit and one minor unit is shaved off (the `.99` pattern). With
/// zero minor units the direction is applied at the tens instead and one unit
/// subtracted, so `ceil(23.23, clp)` becomes 29.
pub fn apply(
    registry: &CurrencyRegistry,
    amount: Decimal,
    currency: &str,
    mode: RoundingMode,
    precision: Option<u32>,
    psych: bool,
) -> Result<Decimal, Error> {
    let minor_unit = registry.minor_unit(currency)?;
    if psych && minor_unit > 0 {
        Ok(step(amount, 0, mode) - Decimal::new(1, minor_unit))
    } else if psych {
        let tens = step(step(amount, 0, mode) / Decimal::TEN, 0, mode);
        Ok((tens - Decimal::new(1, 1)) * Decimal::TEN)
    } else {
        Ok(step(amount, precision.unwrap_or(minor_unit), mode))
    }
}

pub fn round(
    registry: &CurrencyRegistry,
    amount: Decimal,
    currency: &str,
    precision: Option<u32>,
    psych: bool,
) -> Result<Decimal, Error> {
    apply(registry, amount, currency, RoundingMode::Nearest, precision, psych)
}

pub fn ceil(
    registry: &CurrencyRegistry,
    amount: Decimal,
    currency: &str,
    precision: Option<u32>,
    psych: bool,
) -> Result<Decimal, Error> {
    apply(registry, amount, currency, RoundingMode::Up, precision, psych)
}

pub fn floor(
    registry: &CurrencyRegistry,
    amount: Decimal,
    currency: &str,
    precision: Option<u32>,
    psych: bool,
) -> Result<Decimal, Error> {
    apply(registry, amount, currency, RoundingMode::Down, precision, psych)
}

/// Renders `amount` at the currency's minor-unit precision with the
/// currency's digit-group separators.
pub fn stringify(
    registry: &CurrencyRegistry,
    amount: Decimal,
    currency: &str,
    format: Format,
) -> Result<String, Error> {
    let definition = registry.definition(currency)?;
    let minor_unit = definition.minor_unit;

    let mut fixed =
        amount.round_dp_with_strategy(minor_unit, RoundingStrategy::MidpointAwayFromZero);
    fixed.rescale(minor_unit);
    let rendered = fixed.to_string();
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (major, minor) = match digits.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (digits, None),
    };

    let separators = definition.separators.as_ref();
    let major_separator = separators.and_then(|s| s.major.as_deref());
    let grouped = match major_separator {
        Some(separator) if format != Format::Plain => group_digits(major, separator),
        _ => major.to_string(),
    };

    let mut string = format!("{sign}{grouped}");
    if let Some(minor) = minor {
        let minor_separator = match format {
            Format::Plain => ".",
            _ => separators.and_then(|s| s.minor.as_deref()).unwrap_or("."),
        };
        string.push_str(minor_separator);
        string.push_str(minor);
    }

    let prefix = match format {
        Format::Amount | Format::Plain => String::new(),
        Format::Symbol => match &definition.symbol {
            Some(symbol) => symbol.clone(),
            None => format!("{} ", currency.to_uppercase()),
        },
        Format::Code => format!("{} ", currency.to_uppercase()),
    };

    Ok(format!("{prefix}{string}"))
}

fn group_digits(digits: &str, separator: &str) -> String {
    let bytes = digits.as_bytes();
    let mut grouped = String::with_capacity(digits.len() * 2);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(*byte as char);
    }
    grouped
}
