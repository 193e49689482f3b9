//! Interactive menu for converting currencies and inspecting rates
//!
//! The menu reads from any `BufRead` and writes to any `Write`, so the whole
//! session can be driven from tests. Reaching end of input behaves like the
//! quit action.

use std::io::{self, BufRead, Write};

use log::{info, warn};

use crate::cache::{RateCache, RatesOrigin, RefreshReport};
use crate::config::Config;
use crate::data::{RateFetcher, RateSnapshot};
use crate::lookup::RateLookup;

const RULE_WIDTH: usize = 50;
const CODES_PER_ROW: usize = 10;

/// Menu actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Convert,
    ShowRate,
    ListCurrencies,
    Refresh,
    Search,
    Quit,
}

impl MenuChoice {
    /// Maps a menu key ("0".."5") to an action
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "1" => Some(MenuChoice::Convert),
            "2" => Some(MenuChoice::ShowRate),
            "3" => Some(MenuChoice::ListCurrencies),
            "4" => Some(MenuChoice::Refresh),
            "5" => Some(MenuChoice::Search),
            "0" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

/// Whether the menu loop keeps going after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Main application state
pub struct App<F> {
    cache: RateCache<F>,
    lookup: RateLookup,
    snapshot: RateSnapshot,
}

impl<F: RateFetcher> App<F> {
    /// Creates an App with no data loaded yet
    pub fn new(config: &Config, fetcher: F) -> Self {
        Self {
            cache: RateCache::new(config, fetcher),
            lookup: RateLookup::from_config(config),
            snapshot: RateSnapshot::new(),
        }
    }

    pub fn snapshot(&self) -> &RateSnapshot {
        &self.snapshot
    }

    pub fn cache(&self) -> &RateCache<F> {
        &self.cache
    }

    /// True when no rate data is available
    pub fn is_degraded(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Loads rates from the cache or the provider
    ///
    /// With `force`, the provider is asked first regardless of the cache age;
    /// if that fails, any readable cache file is used. Running out of data is
    /// not an error: the app continues in degraded mode.
    pub async fn load<W: Write>(&mut self, force: bool, out: &mut W) -> io::Result<()> {
        if force {
            writeln!(out, "Refreshing exchange rates...")?;
            match self.cache.force_refresh().await {
                Ok(refreshed) => {
                    write_report(out, &refreshed.report)?;
                    self.snapshot = refreshed.snapshot;
                    return Ok(());
                }
                Err(failed) => {
                    write_report(out, &failed.report)?;
                    if let Ok(snapshot) = self.cache.load() {
                        if !snapshot.is_empty() {
                            writeln!(out, "Using previously saved rates")?;
                            self.snapshot = snapshot;
                            return Ok(());
                        }
                    }
                    return write_degraded(out);
                }
            }
        }

        match self.cache.load_or_refresh().await {
            Ok(loaded) => {
                match &loaded.origin {
                    RatesOrigin::Cache { modified } => writeln!(
                        out,
                        "Loaded exchange rates from {} (saved {})",
                        self.cache.path().display(),
                        modified.format("%Y-%m-%d %H:%M")
                    )?,
                    RatesOrigin::Fetched(report) => write_report(out, report)?,
                    RatesOrigin::StaleCache { modified, report } => {
                        write_report(out, report)?;
                        writeln!(
                            out,
                            "Using outdated exchange rates saved {}",
                            modified.format("%Y-%m-%d %H:%M")
                        )?;
                    }
                }
                self.snapshot = loaded.snapshot;
                Ok(())
            }
            Err(e) => {
                warn!("Starting without rates: {}", e);
                self.snapshot = RateSnapshot::new();
                write_degraded(out)
            }
        }
    }

    /// Runs the menu loop until the quit action or end of input
    pub async fn run<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> io::Result<()> {
        loop {
            write_menu(out)?;
            let Some(line) = prompt(input, out, "Choose an action (0-5): ")? else {
                break;
            };

            let flow = match MenuChoice::from_key(&line) {
                Some(MenuChoice::Convert) => self.convert_action(input, out)?,
                Some(MenuChoice::ShowRate) => self.rate_action(input, out)?,
                Some(MenuChoice::ListCurrencies) => self.list_action(out)?,
                Some(MenuChoice::Refresh) => self.refresh_action(out).await?,
                Some(MenuChoice::Search) => self.search_action(input, out)?,
                Some(MenuChoice::Quit) => Flow::Quit,
                None => {
                    writeln!(out, "Invalid choice. Please try again.")?;
                    Flow::Continue
                }
            };

            if flow == Flow::Quit {
                break;
            }
        }

        writeln!(out, "Goodbye!")?;
        out.flush()
    }

    fn convert_action<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> io::Result<Flow> {
        writeln!(out, "\nCURRENCY CONVERSION")?;
        if self.is_degraded() {
            return write_no_data(out);
        }

        let Some(base) = self.prompt_currency(input, out, "Enter base currency code (e.g. USD): ")? else {
            return Ok(Flow::Quit);
        };
        let Some(target) = self.prompt_currency(input, out, "Enter target currency code (e.g. EUR): ")? else {
            return Ok(Flow::Quit);
        };
        let Some(amount) = prompt_amount(input, out)? else {
            return Ok(Flow::Quit);
        };

        match self.lookup.convert(&self.snapshot, amount, &base, &target) {
            Ok(converted) => {
                writeln!(out, "\nConversion result:")?;
                writeln!(out, "{:.2} {} = {:.2} {}", amount, base, converted, target)?;
                if let Ok(reverse) = self.lookup.rate(&self.snapshot, &target, &base) {
                    writeln!(out, "Reverse rate: 1 {} = {:.4} {}", target, reverse, base)?;
                }
            }
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
        Ok(Flow::Continue)
    }

    fn rate_action<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> io::Result<Flow> {
        writeln!(out, "\nEXCHANGE RATE")?;
        if self.is_degraded() {
            return write_no_data(out);
        }

        let Some(base) = self.prompt_currency(input, out, "Enter base currency code: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(target) = self.prompt_currency(input, out, "Enter target currency code: ")? else {
            return Ok(Flow::Quit);
        };

        match self.lookup.rate(&self.snapshot, &base, &target) {
            Ok(rate) => {
                writeln!(out, "\nExchange rate:")?;
                writeln!(out, "1 {} = {:.4} {}", base, rate, target)?;
            }
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
        Ok(Flow::Continue)
    }

    fn list_action<W: Write>(&self, out: &mut W) -> io::Result<Flow> {
        let currencies = self.lookup.available_currencies(&self.snapshot);
        if currencies.is_empty() {
            writeln!(out, "No currencies available")?;
            return Ok(Flow::Continue);
        }

        writeln!(out, "\nAvailable currencies ({}):", currencies.len())?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        for row in currencies.chunks(CODES_PER_ROW) {
            let line: Vec<String> = row.iter().map(|code| format!("{:>4}", code)).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        Ok(Flow::Continue)
    }

    async fn refresh_action<W: Write>(&mut self, out: &mut W) -> io::Result<Flow> {
        writeln!(out, "Refreshing exchange rates...")?;
        match self.cache.force_refresh().await {
            Ok(refreshed) => {
                write_report(out, &refreshed.report)?;
                self.snapshot = refreshed.snapshot;
                writeln!(out, "Exchange rates updated")?;
            }
            Err(failed) => {
                write_report(out, &failed.report)?;
                writeln!(out, "Could not fetch any exchange rates; keeping current data")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn search_action<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> io::Result<Flow> {
        writeln!(out, "\nCURRENCY SEARCH")?;
        let Some(needle) = prompt(input, out, "Enter part of a currency code: ")? else {
            return Ok(Flow::Quit);
        };
        let needle = needle.to_uppercase();

        let found = self.lookup.search(&self.snapshot, &needle);
        if found.is_empty() {
            writeln!(out, "No currencies matching '{}'", needle)?;
        } else {
            writeln!(out, "\nFound {} currencies:", found.len())?;
            for code in found {
                writeln!(out, "  {}", code)?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Prompts until the user enters a currency from the available list
    fn prompt_currency<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        out: &mut W,
        message: &str,
    ) -> io::Result<Option<String>> {
        let available = self.lookup.available_currencies(&self.snapshot);
        loop {
            let Some(line) = prompt(input, out, message)? else {
                return Ok(None);
            };
            let code = line.to_uppercase();
            if code.is_empty() {
                writeln!(out, "Currency code cannot be empty")?;
            } else if available.contains(&code) {
                return Ok(Some(code));
            } else {
                writeln!(out, "Currency {} not found. Please try again.", code)?;
            }
        }
    }
}

/// Writes `message` and reads one trimmed line; `None` at end of input
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> io::Result<Option<String>> {
    write!(out, "{}", message)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Prompts until the user enters a positive finite amount
fn prompt_amount<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<f64>> {
    loop {
        let Some(line) = prompt(input, out, "Enter amount: ")? else {
            return Ok(None);
        };
        match line.parse::<f64>() {
            Ok(amount) if !amount.is_finite() => {
                writeln!(out, "Invalid amount. Please enter a number.")?
            }
            Ok(amount) if amount > 0.0 => return Ok(Some(amount)),
            Ok(_) => writeln!(out, "Amount must be positive")?,
            Err(_) => writeln!(out, "Invalid amount. Please enter a number.")?,
        }
    }
}

fn write_menu<W: Write>(out: &mut W) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "\n{}", rule)?;
    writeln!(out, "CURRENCY CONVERTER")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "1. Convert currency")?;
    writeln!(out, "2. Show exchange rate")?;
    writeln!(out, "3. List available currencies")?;
    writeln!(out, "4. Update exchange rates")?;
    writeln!(out, "5. Search currency by code")?;
    writeln!(out, "0. Exit")?;
    writeln!(out, "{}", rule)
}

fn write_report<W: Write>(out: &mut W, report: &RefreshReport) -> io::Result<()> {
    let total = report.succeeded.len() + report.failed.len();
    for (code, error) in &report.failed {
        writeln!(out, "  Could not fetch rates for {}: {}", code, error)?;
    }
    writeln!(out, "Fetched rates for {}/{} currencies", report.succeeded.len(), total)?;
    if let Some(error) = &report.save_error {
        writeln!(out, "Warning: rates could not be saved: {}", error)?;
    }
    info!("Refresh: {} ok, {} failed", report.succeeded.len(), report.failed.len());
    Ok(())
}

fn write_degraded<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "Unable to load exchange rates. Running with limited functionality."
    )
}

fn write_no_data<W: Write>(out: &mut W) -> io::Result<Flow> {
    writeln!(out, "No exchange rate data available. Use option 4 to update rates.")?;
    Ok(Flow::Continue)
}
