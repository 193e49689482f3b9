//! Queries over an in-memory rate snapshot
//!
//! Nothing here touches the network or the filesystem.

use thiserror::Error;

use crate::config::Config;
use crate::data::{BaseCurrencyEntry, RateSnapshot};

/// Errors returned by rate lookups
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// The base currency has no rate table in the snapshot
    #[error("base currency {0} not found")]
    BaseNotFound(String),

    /// The base table has no rate for the target currency
    #[error("target currency {target} not found for base {base}")]
    TargetNotFound { base: String, target: String },

    /// The amount or the converted result is NaN or infinite
    #[error("conversion of {amount} {base} to {target} is not a finite number")]
    NonFinite {
        amount: f64,
        base: String,
        target: String,
    },
}

/// Derives currency lists, rates and conversions from a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLookup {
    primary_base: String,
}

impl RateLookup {
    pub fn new(primary_base: impl Into<String>) -> Self {
        Self {
            primary_base: normalize(&primary_base.into()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.primary_base.as_str())
    }

    pub fn primary_base(&self) -> &str {
        &self.primary_base
    }

    /// The entry whose targets define the available currencies
    ///
    /// The primary base when present, otherwise the first base in code order.
    fn reference_entry<'a>(&self, snapshot: &'a RateSnapshot) -> Option<&'a BaseCurrencyEntry> {
        snapshot
            .get(&self.primary_base)
            .or_else(|| snapshot.bases().next().and_then(|base| snapshot.get(base)))
    }

    /// Target currencies of the reference entry, sorted by code
    ///
    /// Empty when the snapshot holds no rate tables.
    pub fn available_currencies(&self, snapshot: &RateSnapshot) -> Vec<String> {
        self.reference_entry(snapshot)
            .map(|entry| entry.rates.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Units of `target` per one unit of `base`
    ///
    /// A known base always converts to itself at 1.0, even when the provider
    /// omitted the self-rate.
    pub fn rate(&self, snapshot: &RateSnapshot, base: &str, target: &str) -> Result<f64, LookupError> {
        let base = normalize(base);
        let target = normalize(target);

        let entry = snapshot
            .get(&base)
            .ok_or_else(|| LookupError::BaseNotFound(base.clone()))?;

        match entry.rates.get(&target) {
            Some(rate) => Ok(*rate),
            None if base == target => Ok(1.0),
            None => Err(LookupError::TargetNotFound { base, target }),
        }
    }

    /// Converts `amount` of `base` into `target`
    pub fn convert(
        &self,
        snapshot: &RateSnapshot,
        amount: f64,
        base: &str,
        target: &str,
    ) -> Result<f64, LookupError> {
        let rate = self.rate(snapshot, base, target)?;
        let converted = amount * rate;

        if !amount.is_finite() || !converted.is_finite() {
            return Err(LookupError::NonFinite {
                amount,
                base: normalize(base),
                target: normalize(target),
            });
        }

        Ok(converted)
    }

    /// Available currencies containing `needle`, case-insensitively, sorted
    pub fn search(&self, snapshot: &RateSnapshot, needle: &str) -> Vec<String> {
        let needle = normalize(needle);
        let mut found: Vec<String> = self
            .available_currencies(snapshot)
            .into_iter()
            .filter(|code| code.to_uppercase().contains(&needle))
            .collect();
        found.sort();
        found
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
