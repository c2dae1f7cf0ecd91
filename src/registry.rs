//! Validated currency and country reference data.
//!
//! Definitions are seeded from YAML documents embedded in the crate, parsed
//! once when the registry is constructed and read-only afterwards. The
//! registry is cheap to share behind an `Arc` and safe for concurrent readers.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::Error;

const CURRENCY_DATA: &str = include_str!("../data/currencies.yaml");
const COUNTRY_DATA: &str = include_str!("../data/countries.yaml");

/// Digit-group separators used when formatting an amount.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Separators {
    pub major: Option<String>,
    pub minor: Option<String>,
}

/// A single currency entry from the reference data.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CurrencyDefinition {
    pub minor_unit: u32,
    pub symbol: Option<String>,
    #[serde(default)]
    pub separators: Option<Separators>,
    #[serde(default)]
    pub supported_providers: Vec<String>,
    #[serde(default)]
    pub historical: bool,
    pub replaced_by: Option<String>,
}

#[derive(Debug)]
pub struct CurrencyRegistry {
    definitions: BTreeMap<String, CurrencyDefinition>,
    country_map: BTreeMap<String, String>,
}

impl CurrencyRegistry {
    /// Parses the embedded reference data and validates its referential
    /// integrity. A broken `replaced_by` or country-map reference indicates
    /// corrupt reference data and fails construction.
    pub fn load() -> Result<Self, Error> {
        Self::from_yaml(CURRENCY_DATA, COUNTRY_DATA)
    }

    fn from_yaml(currencies: &str, countries: &str) -> Result<Self, Error> {
        let definitions: BTreeMap<String, CurrencyDefinition> =
            serde_yaml::from_str(currencies)
                .map_err(|e| Error::Config(format!("invalid currency data: {e}")))?;
        let country_map: BTreeMap<String, String> = serde_yaml::from_str(countries)
            .map_err(|e| Error::Config(format!("invalid country data: {e}")))?;

        for definition in definitions.values() {
            if let Some(replacement) = &definition.replaced_by {
                if !definitions.contains_key(replacement) {
                    return Err(Error::UnknownCurrency(replacement.clone()));
                }
            }
        }

        for (country, currency) in &country_map {
            if !definitions.contains_key(currency) {
                return Err(Error::UnknownCurrency(format!(
                    "{currency} (mapped from country {country})"
                )));
            }
        }

        Ok(Self {
            definitions,
            country_map,
        })
    }

    /// All known definitions, active and historical, keyed by currency code.
    pub fn definitions(&self) -> &BTreeMap<String, CurrencyDefinition> {
        &self.definitions
    }

    pub fn active_definitions(
        &self,
    ) -> impl Iterator<Item = (&String, &CurrencyDefinition)> {
        self.definitions.iter().filter(|(_, d)| !d.historical)
    }

    pub fn historical_definitions(
        &self,
    ) -> impl Iterator<Item = (&String, &CurrencyDefinition)> {
        self.definitions.iter().filter(|(_, d)| d.historical)
    }

    /// The ISO3166 country code to currency code map.
    pub fn country_map(&self) -> &BTreeMap<String, String> {
        &self.country_map
    }

    pub fn definition(&self, code: &str) -> Result<&CurrencyDefinition, Error> {
        self.definitions
            .get(code)
            .ok_or_else(|| Error::UnknownCurrency(code.to_string()))
    }

    /// True if `arg` is a known currency code or a country code that maps to
    /// one. Case-insensitive.
    pub fn defines(&self, arg: &str) -> bool {
        let arg = arg.to_lowercase();
        self.definitions.contains_key(&arg) || self.country_map.contains_key(&arg)
    }

    /// Resolves an argument to a currency code, matching a country code when
    /// the input is not itself a currency.
    pub fn assert_currency(&self, arg: &str) -> Result<String, Error> {
        let lowered = arg.to_lowercase();
        if let Some(currency) = self.country_map.get(&lowered) {
            return Ok(currency.clone());
        }
        if self.definitions.contains_key(&lowered) {
            return Ok(lowered);
        }
        Err(Error::UnknownCurrency(arg.to_string()))
    }

    /// Currency codes a given provider can serve rates for.
    pub fn supported_by(&self, provider_id: &str) -> BTreeSet<String> {
        self.definitions
            .iter()
            .filter(|(_, d)| d.supported_providers.iter().any(|p| p == provider_id))
            .map(|(code, _)| code.clone())
            .collect()
    }

    pub fn minor_unit(&self, code: &str) -> Result<u32, Error> {
        Ok(self.definition(code)?.minor_unit)
    }

    /// The display symbol for a currency, if the reference data defines one.
    pub fn symbol(&self, code: &str) -> Result<Option<&str>, Error> {
        Ok(self.definition(code)?.symbol.as_deref())
    }
}
