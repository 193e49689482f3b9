//! Command-line interface parsing for currconv
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into a validated `Config`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use thiserror::Error;

use crate::config::{Config, DEFAULT_CACHE_FILE, DEFAULT_MAX_AGE_HOURS, DEFAULT_WATCH_LIST};
use crate::data::rates::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A currency code is not three ASCII letters
    #[error("Invalid currency code: '{0}'. Expected three letters, e.g. USD")]
    InvalidCurrency(String),

    /// The primary base is not one of the watched currencies
    #[error("Primary currency {0} is not in the watch-list")]
    PrimaryNotWatched(String),

    /// No base currencies left to fetch
    #[error("The watch-list is empty")]
    EmptyWatchList,
}

/// currconv - Convert currencies using cached exchange rates
#[derive(Parser, Debug)]
#[command(name = "currconv")]
#[command(about = "Interactive currency converter with a local rate cache")]
#[command(version)]
pub struct Cli {
    /// Path of the cached rates file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CACHE_FILE)]
    pub cache_file: PathBuf,

    /// Refresh the cache when it is at least this many hours old
    #[arg(long, value_name = "HOURS", default_value_t = DEFAULT_MAX_AGE_HOURS)]
    pub max_age_hours: u64,

    /// Base currencies to fetch, comma-separated
    ///
    /// Example: currconv --watch usd,eur,jpy
    #[arg(long, value_name = "CODES", value_delimiter = ',', default_values_t = DEFAULT_WATCH_LIST.map(String::from))]
    pub watch: Vec<String>,

    /// Base whose rate table lists the available currencies (default: first watched)
    #[arg(long, value_name = "CODE")]
    pub primary: Option<String>,

    /// Rate API endpoint; requests go to <URL>/<CODE>
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Fetch fresh rates on startup even if the cache is recent
    #[arg(long)]
    pub refresh: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Parses a currency code argument into its canonical upper-case form
pub fn parse_currency_arg(s: &str) -> Result<String, CliError> {
    let code = s.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(CliError::InvalidCurrency(s.to_string()))
    }
}

impl Cli {
    /// Log level selected by the `-v` count
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl Config {
    /// Creates a Config from parsed CLI arguments.
    ///
    /// Codes are upper-cased and duplicates in the watch-list are dropped.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut watch_list: Vec<String> = Vec::new();
        for raw in cli.watch.iter().filter(|s| !s.trim().is_empty()) {
            let code = parse_currency_arg(raw)?;
            if !watch_list.contains(&code) {
                watch_list.push(code);
            }
        }

        let primary_base = match &cli.primary {
            Some(raw) => {
                let code = parse_currency_arg(raw)?;
                if !watch_list.contains(&code) {
                    return Err(CliError::PrimaryNotWatched(code));
                }
                code
            }
            None => match watch_list.first() {
                Some(code) => code.clone(),
                None => return Err(CliError::EmptyWatchList),
            },
        };

        Ok(Config {
            cache_path: cli.cache_file.clone(),
            watch_list,
            primary_base,
            max_age_hours: cli.max_age_hours,
            api_base_url: cli.api_url.clone(),
            request_timeout: Duration::from_secs(cli.timeout_secs),
        })
    }
}
