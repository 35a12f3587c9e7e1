use std::fmt;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dashboard_core::{
    Config, DashboardController, DashboardSnapshot, Direction, FETCH_FAILED_MESSAGE,
    RefreshOutcome, display,
};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Weather dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Show the dashboard for a city once.
    Show {
        /// City name; defaults to the configured default city.
        city: Option<String>,

        /// Show the hourly forecast instead of the 5-day one.
        #[arg(long)]
        hourly: bool,

        /// Hourly forecast page (0-4).
        #[arg(
            long,
            default_value_t = 0,
            requires = "hourly",
            value_parser = clap::value_parser!(u8).range(0..5)
        )]
        page: u8,

        /// Print the dashboard state as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Browse the dashboard interactively.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                city,
                hourly,
                page,
                json,
            } => {
                let config = Config::load()?.with_env_overrides();
                let city = city.unwrap_or_else(|| config.default_city.clone());
                if city.trim().is_empty() {
                    bail!("City name must not be empty");
                }

                let controller = DashboardController::from_config(&config)?;
                if hourly {
                    controller.toggle_hourly_view();
                }
                for _ in 0..page {
                    controller.advance_window(Direction::Forward);
                }

                if controller.refresh(&city).await == RefreshOutcome::Failed {
                    bail!(FETCH_FAILED_MESSAGE);
                }

                let snapshot = controller.snapshot();
                if json {
                    let out = serde_json::to_string_pretty(&snapshot)
                        .context("Failed to serialize dashboard")?;
                    println!("{out}");
                } else {
                    print!("{}", render::render(&snapshot, local_hour(&snapshot)));
                }
                Ok(())
            }
            Command::Interactive => {
                let config = Config::load()?.with_env_overrides();
                let controller = DashboardController::from_config(&config)?;
                interactive(&controller, &config.default_city).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(key.to_string());
    config.save()?;

    println!("Saved API key to {}", Config::config_file_path()?.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Search,
    ToggleView,
    NextPage,
    PreviousPage,
    Refresh,
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuItem::Search => "Search city",
            MenuItem::ToggleView => "Toggle daily/hourly",
            MenuItem::NextPage => "Next hours",
            MenuItem::PreviousPage => "Previous hours",
            MenuItem::Refresh => "Refresh",
            MenuItem::Quit => "Quit",
        };
        f.write_str(label)
    }
}

fn menu_items(snapshot: &DashboardSnapshot) -> Vec<MenuItem> {
    let mut items = vec![MenuItem::Search, MenuItem::ToggleView];
    if snapshot.hourly_view && snapshot.data.is_some() {
        if snapshot.hourly_window.can_advance() {
            items.push(MenuItem::NextPage);
        }
        if snapshot.hourly_window.can_retreat() {
            items.push(MenuItem::PreviousPage);
        }
    }
    items.push(MenuItem::Refresh);
    items.push(MenuItem::Quit);
    items
}

async fn interactive(controller: &DashboardController, default_city: &str) -> anyhow::Result<()> {
    debug!(city = default_city, "initial refresh");
    controller.refresh(default_city).await;

    loop {
        let snapshot = controller.snapshot();
        println!();
        print!("{}", render::render(&snapshot, local_hour(&snapshot)));

        let choice = match Select::new("What next?", menu_items(&snapshot)).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        match choice {
            MenuItem::Search => {
                let initial = snapshot.query.clone().unwrap_or_default();
                let city = match Text::new("City:").with_initial_value(&initial).prompt() {
                    Ok(city) => city,
                    Err(InquireError::OperationCanceled) => continue,
                    Err(e) => return Err(e.into()),
                };
                debug!(city = %city.trim(), "searching");
                if controller.refresh(&city).await == RefreshOutcome::Ignored {
                    println!("Please enter a city name.");
                }
            }
            MenuItem::ToggleView => {
                controller.toggle_hourly_view();
            }
            MenuItem::NextPage => {
                controller.advance_window(Direction::Forward);
            }
            MenuItem::PreviousPage => {
                controller.advance_window(Direction::Backward);
            }
            MenuItem::Refresh => {
                let city = snapshot.query.as_deref().unwrap_or(default_city);
                debug!(city, "refreshing");
                controller.refresh(city).await;
            }
            MenuItem::Quit => break,
        }
    }

    Ok(())
}

/// Current hour at the dashboard's location, falling back to UTC.
fn local_hour(snapshot: &DashboardSnapshot) -> u32 {
    let offset = snapshot
        .data
        .as_ref()
        .map_or(0, |d| d.current.timezone_offset_secs);
    display::local_hour(Utc::now(), offset)
}
