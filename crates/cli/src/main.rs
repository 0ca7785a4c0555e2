use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use packwise_core::{ReminderSettings, TimeOfDay, Trip};
use packwise_observability::{init_tracing, ReminderMetrics};
use packwise_scheduler::ReminderScheduler;
use packwise_storage::{NotificationGateway, Store, TripProvider};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "packwise")]
#[command(about = "Packwise trip reminder CLI")]
struct Cli {
    /// sqlite URL; an in-memory store is used when unset.
    #[arg(long, env = "PACKWISE_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Trips {
        #[command(subcommand)]
        command: TripsCommand,
    },
    Reminders {
        #[command(subcommand)]
        command: RemindersCommand,
    },
}

#[derive(Debug, Subcommand)]
enum TripsCommand {
    /// Import one trip or an array of trips from a JSON file.
    Import { file: PathBuf },
    List,
}

#[derive(Debug, Subcommand)]
enum RemindersCommand {
    /// Show the reminders a sync would schedule, without scheduling them.
    Preview {
        #[arg(long)]
        trip: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    Sync {
        #[arg(long)]
        trip: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    Cancel {
        #[arg(long)]
        trip: String,
    },
    List,
    /// Print and remove notifications whose trigger time has passed.
    Due,
}

#[derive(Debug, Args)]
struct SettingsArgs {
    #[arg(long)]
    premium: bool,
    #[arg(long, default_value = "09:00")]
    time: TimeOfDay,
    #[arg(long)]
    no_weather: bool,
    #[arg(long)]
    essentials_only: bool,
    #[arg(long)]
    disabled: bool,
}

impl SettingsArgs {
    fn to_settings(&self) -> ReminderSettings {
        ReminderSettings {
            enabled: !self.disabled,
            time_of_day: self.time,
            include_weather_reminders: !self.no_weather,
            include_essential_only: self.essentials_only,
            ..ReminderSettings::default()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TripFile {
    Many(Vec<Trip>),
    One(Trip),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("packwise_cli");
    let cli = Cli::parse();

    let store = match cli.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => Store::memory(),
    };
    let store = Arc::new(store);
    let scheduler = ReminderScheduler::new(store.clone(), ReminderMetrics::shared());

    match cli.command {
        Command::Trips { command } => match command {
            TripsCommand::Import { file } => {
                let raw = fs::read_to_string(&file)
                    .with_context(|| format!("failed reading {}", file.display()))?;
                let trips = match serde_json::from_str::<TripFile>(&raw)
                    .with_context(|| format!("invalid trip json in {}", file.display()))?
                {
                    TripFile::Many(trips) => trips,
                    TripFile::One(trip) => vec![trip],
                };

                for trip in &trips {
                    store.upsert_trip(trip).await?;
                }
                println!("imported {} trip(s)", trips.len());
            }
            TripsCommand::List => {
                let trips = store.list_trips().await?;
                println!("{}", serde_json::to_string_pretty(&trips)?);
            }
        },
        Command::Reminders { command } => match command {
            RemindersCommand::Preview { trip, settings } => {
                let trip = require_trip(&store, &trip).await?;
                let reminders = scheduler.generate_smart_reminders(
                    &trip,
                    &settings.to_settings(),
                    settings.premium,
                );
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            }
            RemindersCommand::Sync { trip, settings } => {
                let trip = require_trip(&store, &trip).await?;
                let outcome = scheduler
                    .update_reminders_for_trip(&trip, &settings.to_settings(), settings.premium)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            RemindersCommand::Cancel { trip } => {
                let cancelled = scheduler.cancel_reminders_for_trip(&trip).await?;
                println!("cancelled {cancelled} reminder(s) for {trip}");
            }
            RemindersCommand::List => {
                let scheduled = store.get_all_scheduled().await?;
                println!("{}", serde_json::to_string_pretty(&scheduled)?);
            }
            RemindersCommand::Due => {
                let due = store.take_due(Local::now().naive_local()).await?;
                for notification in &due {
                    println!(
                        "[{}] {}\n  {}",
                        notification.trigger_at, notification.title, notification.body
                    );
                }
                if due.is_empty() {
                    println!("nothing due");
                }
            }
        },
    }

    Ok(())
}

async fn require_trip(store: &Store, trip_id: &str) -> Result<Trip> {
    store
        .load_trip(trip_id)
        .await?
        .with_context(|| format!("no trip with id {}", trip_id))
}
