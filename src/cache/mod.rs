//! Cache module for storing the rate snapshot on disk
//!
//! The snapshot lives in a single JSON file. Its modification time decides
//! freshness; a missing, stale or unreadable file triggers a refresh from the
//! rate provider, and every successful refresh atomically replaces the file.

mod manager;

pub use manager::{
    is_recent, modified_at, read_snapshot, write_snapshot, CacheError, LoadedRates, RateCache,
    RatesOrigin, RefreshFailed, RefreshReport, Refreshed,
};
