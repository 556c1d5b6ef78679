use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Text;
use meteo_core::{Config, DefaultLocation, ForecastMode, Interval, Location, WeatherFacade};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Weather tables for any place")]
pub struct Cli {
    /// Log filter, e.g. "debug" or "meteo_core=trace". Falls back to RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show weather for a location.
    Show {
        /// Country; defaults to the configured country.
        #[arg(long)]
        country: Option<String>,

        /// City name.
        #[arg(long)]
        city: Option<String>,

        /// Postal code.
        #[arg(long)]
        postal_code: Option<String>,

        /// current, past or forecast.
        #[arg(long, default_value = "forecast")]
        mode: ForecastMode,

        /// current, hourly or daily; defaults to current for current mode and
        /// daily otherwise.
        #[arg(long)]
        interval: Option<Interval>,

        /// Window width: days for daily data, hours for hourly data.
        #[arg(long)]
        span: Option<u32>,
    },

    /// Set the default location and timezone interactively.
    Configure,

    /// Print the location of the config file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Show { country, city, postal_code, mode, interval, span } => {
                let config = Config::load()?;
                let location = location_from_args(&config.defaults, country, city, postal_code);
                let interval = interval.unwrap_or_else(|| default_interval(mode));
                show(&config, &location, mode, interval, span.unwrap_or_else(|| default_span(interval))).await
            }
            Command::Configure => configure(),
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

async fn show(
    config: &Config,
    location: &Location,
    mode: ForecastMode,
    interval: Interval,
    span: u32,
) -> anyhow::Result<()> {
    // Geocoding below is a network call; bad input must not get that far.
    location.validate()?;
    mode.validate_interval(interval)?;

    tracing::debug!("Showing {} {} weather for {}", mode, interval, location);
    let facade = WeatherFacade::from_config(config).context("Failed to set up weather client")?;

    let resolved = facade.resolve_location(location).await?;
    let table = facade.get_weather(&resolved, mode, interval, span).await?;

    println!("{}", render::header(&resolved, mode, interval));
    if table.is_empty() {
        println!("No data for the requested window.");
    } else {
        print!("{}", render::render_table(&table, interval));
    }
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.defaults.country = Text::new("Default country:")
        .with_default(&config.defaults.country)
        .prompt()?;
    config.defaults.city = Text::new("Default city:")
        .with_default(&config.defaults.city)
        .prompt()?;
    config.defaults.postal_code = Text::new("Default postal code:")
        .with_default(&config.defaults.postal_code)
        .prompt()?;
    config.timezone = Text::new("Timezone (IANA name or \"auto\"):")
        .with_default(&config.timezone)
        .prompt()?;

    config.save()?;
    let path = Config::config_file_path()?;
    tracing::info!("Saved configuration to {}", path.display());
    println!("Saved configuration to {}", path.display());
    Ok(())
}

/// Typed parts win; an untyped country falls back to the default, and so do
/// city and postal code when neither was typed.
fn location_from_args(
    defaults: &DefaultLocation,
    country: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
) -> Location {
    let country = country.unwrap_or_else(|| defaults.country.clone());
    match (city, postal_code) {
        (None, None) => Location::new(country, defaults.city.clone(), defaults.postal_code.clone()),
        (city, postal_code) => Location::new(country, city.unwrap_or_default(), postal_code.unwrap_or_default()),
    }
}

fn default_interval(mode: ForecastMode) -> Interval {
    match mode {
        ForecastMode::Current => Interval::Current,
        ForecastMode::Past | ForecastMode::Forecast => Interval::Daily,
    }
}

fn default_span(interval: Interval) -> u32 {
    match interval {
        Interval::Current => 0,
        Interval::Hourly => 24,
        Interval::Daily => 7,
    }
}
