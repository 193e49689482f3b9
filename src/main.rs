//! currconv - convert currencies from the command line
//!
//! An interactive menu that converts amounts and shows exchange rates using a
//! locally cached snapshot, refreshed from the rate provider once a day.

use std::io::{self, Write};
use std::process;

use clap::Parser;

use currconv::app::App;
use currconv::cli::Cli;
use currconv::config::Config;
use currconv::data::ExchangeRateClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .init();

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let client = ExchangeRateClient::new(config.api_base_url.clone(), config.request_timeout)?;
    let mut app = App::new(&config, client);

    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();

    writeln!(out, "Welcome to the currency converter!")?;
    app.load(cli.refresh, &mut out).await?;
    app.run(&mut input, &mut out).await?;

    Ok(())
}
