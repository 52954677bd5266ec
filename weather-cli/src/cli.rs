use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use tracing::debug;
use tokio::task::JoinHandle;
use weather_core::{Config, FetchResult, ResultController, WeatherApiProvider};

use crate::render::{format_card, format_result};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather by city name")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the weatherapi.com API key.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,

        /// Override the `current.json` endpoint.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Show current weather for a city.
    Show {
        /// City or location name; the configured default when absent.
        city: Option<String>,

        /// Print the record as JSON instead of a card.
        #[arg(long)]
        json: bool,
    },

    /// Search locations interactively until Esc or an empty query.
    Search,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key, base_url } => configure(api_key, base_url),
            Command::Show { city, json } => show(city, json).await,
            Command::Search => search().await,
        }
    }
}

fn configure(api_key: Option<String>, base_url: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = match api_key {
        Some(key) => key,
        None => Password::new("weatherapi.com API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };
    config.set_api_key(api_key);
    if base_url.is_some() {
        config.base_url = base_url;
    }

    let path = config.save()?;
    debug!(path = %path.display(), "configuration saved");
    println!("Configuration saved to {}", path.display());

    Ok(())
}

fn controller(config: &Config) -> anyhow::Result<ResultController> {
    let provider = WeatherApiProvider::from_config(config)?;
    Ok(ResultController::new(Arc::new(provider)).with_default_query(config.default_query()))
}

async fn show(city: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let controller = controller(&config)?;

    let query = city.unwrap_or_else(|| config.default_query().to_string());
    debug!(query = %query, json, "showing current weather");
    let fetch = controller.fetch_weather(&query);

    match settle(&controller, fetch).await? {
        FetchResult::Success(data) if json => {
            let out = serde_json::to_string_pretty(&data)
                .context("Failed to serialize weather record")?;
            println!("{out}");
        }
        FetchResult::Success(data) => print!("{}", format_card(&data)),
        FetchResult::Error(message) => bail!(message),
        FetchResult::Loading => bail!("Weather fetch ended without a result"),
    }

    Ok(())
}

async fn search() -> anyhow::Result<()> {
    let config = Config::load()?;
    let controller = controller(&config)?;

    if let Some(fetch) = controller.fetch_default_if_unset() {
        let result = settle(&controller, fetch).await?;
        println!("{}", format_result(Some(&result)));
    }

    while let Some(query) = tokio::task::spawn_blocking(prompt_query).await?? {
        let fetch = controller.fetch_weather(&query);
        let result = settle(&controller, fetch).await?;
        println!("{}", format_result(Some(&result)));
    }

    Ok(())
}

/// Print the loading line, wait for `fetch` to finish and return what it published.
async fn settle(
    controller: &ResultController,
    fetch: JoinHandle<()>,
) -> anyhow::Result<FetchResult> {
    eprintln!("{}", format_result(controller.current_result().as_ref()));

    fetch.await.context("Weather fetch task failed")?;

    controller
        .current_result()
        .filter(FetchResult::is_terminal)
        .context("Weather fetch ended without a result")
}

/// `None` when the user is done searching.
fn prompt_query() -> anyhow::Result<Option<String>> {
    match Text::new("Search for location").prompt() {
        Ok(query) if query.trim().is_empty() => Ok(None),
        Ok(query) => Ok(Some(query)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err).context("Failed to read search query"),
    }
}
