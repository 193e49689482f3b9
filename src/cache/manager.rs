//! Rate cache for persisting the snapshot to disk
//!
//! Provides a `RateCache` that keeps one JSON snapshot file, decides whether
//! it is fresh from the file's modification time, and refreshes it from a
//! `RateFetcher` when it is missing, stale or unreadable.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Config;
use crate::data::{FetchError, InvalidRate, RateFetcher, RateSnapshot};

/// Errors that can occur while loading, refreshing or saving the snapshot
#[derive(Debug, Error)]
pub enum CacheError {
    /// Every watched currency failed to fetch and no cached data was usable
    #[error("no exchange rate data available")]
    NoData,

    /// The cache file is not valid snapshot JSON
    #[error("failed to parse cache file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The cache file parsed but holds a rate that is not positive and finite
    #[error("cache file holds an {0}")]
    InvalidRate(#[from] InvalidRate),

    /// Reading or writing the cache file failed
    #[error("cache file I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of one pass over the watch-list
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Codes fetched successfully, in watch-list order
    pub succeeded: Vec<String>,
    /// Codes that failed, with the reason
    pub failed: Vec<(String, FetchError)>,
    /// Set when the new snapshot could not be written to disk
    pub save_error: Option<CacheError>,
}

/// A freshly fetched snapshot and how the fetch went
#[derive(Debug)]
pub struct Refreshed {
    pub snapshot: RateSnapshot,
    pub report: RefreshReport,
}

/// Where a loaded snapshot came from
#[derive(Debug)]
pub enum RatesOrigin {
    /// Recent cache file, no network used
    Cache { modified: DateTime<Local> },
    /// Fetched from the provider
    Fetched(RefreshReport),
    /// Every fetch failed; an expired but readable cache file was used instead
    StaleCache {
        modified: DateTime<Local>,
        report: RefreshReport,
    },
}

/// Result of `RateCache::load_or_refresh`
#[derive(Debug)]
pub struct LoadedRates {
    pub snapshot: RateSnapshot,
    pub origin: RatesOrigin,
}

/// Returns true if a file modified at `modified` is younger than `max_age` at `now`
///
/// A modification time in the future counts as recent.
pub fn is_recent(modified: DateTime<Local>, now: DateTime<Local>, max_age: Duration) -> bool {
    now.signed_duration_since(modified) < max_age
}

/// Reads the modification time of `path` in local time
pub fn modified_at(path: &Path) -> io::Result<DateTime<Local>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified))
}

/// Reads and validates a snapshot file, ignoring its age
pub fn read_snapshot(path: &Path) -> Result<RateSnapshot, CacheError> {
    let content = fs::read_to_string(path)?;
    let snapshot: RateSnapshot = serde_json::from_str(&content)?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Writes a snapshot as pretty-printed UTF-8 JSON
///
/// The JSON is rendered fully in memory, written to a temp file in the
/// target directory, then renamed over `path`. A failure at any step leaves
/// the previous file untouched.
pub fn write_snapshot(path: &Path, snapshot: &RateSnapshot) -> Result<(), CacheError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut json = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut json, PrettyFormatter::with_indent(b"    "));
    snapshot.serialize(&mut serializer)?;
    json.push(b'\n');

    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&json)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Owns the snapshot file and its freshness policy
///
/// Network access happens only through the wrapped `RateFetcher`, and only
/// when the file is missing, stale, unreadable, or a refresh is forced.
#[derive(Debug)]
pub struct RateCache<F> {
    path: PathBuf,
    watch_list: Vec<String>,
    max_age: Duration,
    fetcher: F,
}

impl<F: RateFetcher> RateCache<F> {
    pub fn new(config: &Config, fetcher: F) -> Self {
        let max_age = i64::try_from(config.max_age_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);

        Self {
            path: config.cache_path.clone(),
            watch_list: config.watch_list.clone(),
            max_age,
            fetcher,
        }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns the cached snapshot if the file is recent at `now` and parses
    ///
    /// Any I/O or parse failure is logged and reported as a miss.
    pub fn read_if_recent(&self, now: DateTime<Local>) -> Option<(RateSnapshot, DateTime<Local>)> {
        let modified = match modified_at(&self.path) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("No usable cache at {}: {}", self.path.display(), e);
                return None;
            }
        };

        if !is_recent(modified, now, self.max_age) {
            info!("Cache {} is stale (modified {})", self.path.display(), modified);
            return None;
        }

        self.read_usable(modified)
    }

    /// Loads the cached snapshot, or refreshes it from the provider
    ///
    /// # Returns
    /// * `Ok(LoadedRates)` with `RatesOrigin::Cache` if the file was recent and valid
    /// * `Ok(LoadedRates)` with `RatesOrigin::Fetched` if at least one fetch succeeded
    /// * `Ok(LoadedRates)` with `RatesOrigin::StaleCache` if every fetch failed
    ///   but an expired file could still be read
    /// * `Err(CacheError::NoData)` if nothing usable was found
    pub async fn load_or_refresh(&self) -> Result<LoadedRates, CacheError> {
        if let Some((snapshot, modified)) = self.read_if_recent(Local::now()) {
            info!("Loaded {} rate tables from {}", snapshot.len(), self.path.display());
            return Ok(LoadedRates {
                snapshot,
                origin: RatesOrigin::Cache { modified },
            });
        }

        let report = match self.force_refresh().await {
            Ok(refreshed) => {
                return Ok(LoadedRates {
                    snapshot: refreshed.snapshot,
                    origin: RatesOrigin::Fetched(refreshed.report),
                })
            }
            Err(RefreshFailed { report }) => report,
        };

        // Fetches all failed; an expired file beats no data at all
        let modified = modified_at(&self.path).map_err(|_| CacheError::NoData)?;
        match self.read_usable(modified) {
            Some((snapshot, modified)) => {
                warn!("Using expired cache from {}", modified);
                Ok(LoadedRates {
                    snapshot,
                    origin: RatesOrigin::StaleCache { modified, report },
                })
            }
            None => Err(CacheError::NoData),
        }
    }

    /// Fetches every watched currency and persists the result, ignoring the cache
    ///
    /// Currencies that fail to fetch are left out. A save failure is recorded
    /// in the report; the fetched snapshot is still returned.
    pub async fn force_refresh(&self) -> Result<Refreshed, RefreshFailed> {
        let fetches = self.watch_list.iter().map(|code| self.fetcher.fetch(code));
        let results = join_all(fetches).await;

        let mut snapshot = RateSnapshot::new();
        let mut report = RefreshReport::default();

        for (code, result) in self.watch_list.iter().zip(results) {
            match result {
                Ok(entry) => {
                    debug!("Fetched {} rates for {}", entry.rates.len(), code);
                    snapshot.insert(code.clone(), entry);
                    report.succeeded.push(code.clone());
                }
                Err(e) => {
                    warn!("Failed to fetch rates for {}: {}", code, e);
                    report.failed.push((code.clone(), e));
                }
            }
        }

        info!(
            "Fetched rates for {}/{} currencies",
            report.succeeded.len(),
            self.watch_list.len()
        );

        if snapshot.is_empty() {
            return Err(RefreshFailed { report });
        }

        if let Err(e) = self.persist(&snapshot) {
            warn!("Failed to save {}: {}", self.path.display(), e);
            report.save_error = Some(e);
        }

        Ok(Refreshed { snapshot, report })
    }

    /// Atomically writes `snapshot` to the cache file
    pub fn persist(&self, snapshot: &RateSnapshot) -> Result<(), CacheError> {
        write_snapshot(&self.path, snapshot)
    }

    /// Reads the cache file regardless of age
    pub fn load(&self) -> Result<RateSnapshot, CacheError> {
        read_snapshot(&self.path)
    }

    fn read_usable(&self, modified: DateTime<Local>) -> Option<(RateSnapshot, DateTime<Local>)> {
        match read_snapshot(&self.path) {
            Ok(snapshot) if !snapshot.is_empty() => Some((snapshot, modified)),
            Ok(_) => {
                warn!("Cache {} holds no rate tables", self.path.display());
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable cache {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Every fetch in a forced refresh failed
#[derive(Debug, Error)]
#[error("no exchange rate data available: all {} fetches failed", .report.failed.len())]
pub struct RefreshFailed {
    pub report: RefreshReport,
}

impl From<RefreshFailed> for CacheError {
    fn from(_: RefreshFailed) -> Self {
        CacheError::NoData
    }
}
