//! Core data models for the currency converter
//!
//! A `RateSnapshot` maps base-currency codes to the rate table fetched for
//! that base. This is exactly the shape persisted to the cache file:
//!
//! ```json
//! { "USD": { "result": "success", "rates": { "EUR": 0.9, ... }, ... }, ... }
//! ```

pub mod rates;

pub use rates::{ExchangeRateClient, FetchError, RateFetcher};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A rate that breaks the "positive finite number" invariant
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid rate {base}->{target}: {value}")]
pub struct InvalidRate {
    pub base: String,
    pub target: String,
    pub value: f64,
}

/// Rate table for a single base currency, plus whatever metadata the
/// provider sent alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCurrencyEntry {
    /// Target currency code -> units of target per one unit of base
    pub rates: BTreeMap<String, f64>,
    /// Provider status, `"success"` for a usable table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Base code as reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_last_update_unix: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_last_update_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_next_update_unix: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_next_update_utc: Option<String>,
    /// Any other provider fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BaseCurrencyEntry {
    /// Creates an entry holding only a rate table
    pub fn from_rates<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            rates: rates.into_iter().map(|(code, rate)| (code.into(), rate)).collect(),
            result: None,
            base_code: None,
            time_last_update_unix: None,
            time_last_update_utc: None,
            time_next_update_unix: None,
            time_next_update_utc: None,
            extra: Map::new(),
        }
    }

    /// Checks that every rate is a positive finite number
    pub fn validate(&self, base: &str) -> Result<(), InvalidRate> {
        match self
            .rates
            .iter()
            .find(|(_, rate)| !is_valid_rate(**rate))
        {
            Some((target, value)) => Err(InvalidRate {
                base: base.to_string(),
                target: target.clone(),
                value: *value,
            }),
            None => Ok(()),
        }
    }
}

/// Returns true for rates that are positive and finite
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// All cached rate tables, keyed by base currency code
///
/// Different bases may have been fetched at different times, so their sets
/// of target currencies are not required to agree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateSnapshot {
    bases: BTreeMap<String, BaseCurrencyEntry>,
}

impl RateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the rate table for `base`
    pub fn insert(&mut self, base: impl Into<String>, entry: BaseCurrencyEntry) {
        self.bases.insert(base.into(), entry);
    }

    pub fn get(&self, base: &str) -> Option<&BaseCurrencyEntry> {
        self.bases.get(base)
    }

    pub fn contains_base(&self, base: &str) -> bool {
        self.bases.contains_key(base)
    }

    /// Base currency codes in lexicographic order
    pub fn bases(&self) -> impl Iterator<Item = &str> {
        self.bases.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Checks every entry's rates, reporting the first invalid one
    pub fn validate(&self) -> Result<(), InvalidRate> {
        self.bases
            .iter()
            .try_for_each(|(base, entry)| entry.validate(base))
    }
}
