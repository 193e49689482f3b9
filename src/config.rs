//! Runtime configuration shared by the cache, the lookup layer and the menu

use std::path::PathBuf;
use std::time::Duration;

use crate::data::rates::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT};

/// Default cache file, relative to the working directory
pub const DEFAULT_CACHE_FILE: &str = "currency.json";

/// Base currencies refreshed proactively
pub const DEFAULT_WATCH_LIST: [&str; 4] = ["USD", "EUR", "GBP", "RUB"];

/// Cache files older than this are refreshed
pub const DEFAULT_MAX_AGE_HOURS: u64 = 24;

/// Everything the converter needs to know about where rates live
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path of the persisted snapshot
    pub cache_path: PathBuf,
    /// Base currencies fetched on every refresh, in order
    pub watch_list: Vec<String>,
    /// Base whose targets define the available-currency list
    pub primary_base: String,
    /// Freshness window for the cache file
    pub max_age_hours: u64,
    /// Endpoint prefix; requests go to `{api_base_url}/{CODE}`
    pub api_base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            watch_list: DEFAULT_WATCH_LIST.iter().map(|c| c.to_string()).collect(),
            primary_base: DEFAULT_WATCH_LIST[0].to_string(),
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
