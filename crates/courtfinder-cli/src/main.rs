//! courtfinder - find free badminton courts across ActiveSG venues.
//!
//! Queries every configured venue for the given date, prints merged results
//! as they complete and a Venue / Court / Slots table at the end.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use courtfinder_core::utils::truncate_string;
use courtfinder_core::{Config, SearchError, SearchSession, SlotRecord, VenueId};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Widest a venue name may print in the table
const MAX_VENUE_WIDTH: usize = 40;

/// Widest a court label may print in the table
const MAX_COURT_WIDTH: usize = 16;

/// Exit status when the search can't start because of bad input
const USAGE_EXIT_CODE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "courtfinder", version, about = "Search ActiveSG venues for free badminton courts")]
struct Cli {
    /// Date to search, YYYY-MM-DD
    #[arg(short, long, default_value = "")]
    date: String,

    /// Value of the ActiveSG session cookie
    #[arg(short, long, default_value = "")]
    cookie: String,

    /// Venue id to search (repeatable); replaces the configured list
    #[arg(short, long = "venue")]
    venues: Vec<String>,

    /// Only show rows containing this text (case-insensitive)
    #[arg(short, long, default_value = "")]
    filter: String,

    /// Backend endpoint, overrides config and COURTFINDER_ENDPOINT
    #[arg(long)]
    endpoint: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
/// The returned guard must live until exit so file logs get flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env_overrides();
            config
        }
        None => Config::load()?,
    };
    if let Some(ref endpoint) = cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if !cli.venues.is_empty() {
        config.venues = cli.venues.iter().map(|v| VenueId::from(v.as_str())).collect();
    }
    Ok(config)
}

enum Step {
    Updated(bool),
    Interrupted,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    info!("courtfinder starting");

    let config = load_config(&cli)?;
    let mut session = SearchSession::from_config(&config).context("Failed to set up search")?;

    if let Err(e) = session.submit(&cli.date, &cli.cookie) {
        return match usage_message(&e) {
            Some(message) => {
                eprintln!("{}", message);
                Ok(ExitCode::from(USAGE_EXIT_CODE))
            }
            None => Err(e.into()),
        };
    }

    let mut interrupted = false;
    loop {
        let step = tokio::select! {
            updated = session.next_update() => Step::Updated(updated),
            _ = tokio::signal::ctrl_c(), if !interrupted => Step::Interrupted,
        };
        match step {
            Step::Updated(false) => break,
            Step::Updated(true) => {
                if !cli.json {
                    eprint!("\r{}", session.progress().label());
                    let _ = io::stderr().flush();
                }
            }
            Step::Interrupted => {
                warn!("Interrupted, cancelling search");
                interrupted = true;
                session.cancel();
            }
        }
    }
    session.wait().await;
    if !cli.json {
        eprintln!();
    }

    let rows = session.results().filter(&cli.filter);
    if cli.json {
        let statuses: Vec<_> = session
            .statuses()
            .iter()
            .map(|(venue, status)| serde_json::json!({ "venue": venue, "status": status }))
            .collect();
        let output = serde_json::json!({
            "date": session.criteria().map(|c| c.date.to_string()),
            "progress": session.progress(),
            "results": rows,
            "venues": statuses,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(&rows);
        for (venue, reason) in session.failures() {
            eprintln!("Venue {} failed: {}", venue, reason);
        }
    }

    info!("courtfinder finished");
    Ok(ExitCode::SUCCESS)
}

/// What to tell the user when a search can't start because of their input.
/// `None` for errors that aren't the user's to fix.
fn usage_message(err: &SearchError) -> Option<String> {
    match err {
        SearchError::MissingCriteria { date, credential } => {
            let mut lines = Vec::new();
            if *date {
                lines.push("Please enter date (--date YYYY-MM-DD)");
            }
            if *credential {
                lines.push("Please provide cookie (--cookie <ActiveSG cookie>)");
            }
            Some(lines.join("\n"))
        }
        SearchError::InvalidDate(_) => Some(err.to_string()),
        SearchError::NoVenues => Some(format!(
            "No venues configured. Pass --venue <id> or add \"venues\" to {}",
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        )),
        _ => None,
    }
}

fn print_table(rows: &[&SlotRecord]) {
    if rows.is_empty() {
        println!("No results");
        return;
    }

    let venue_width = rows
        .iter()
        .map(|r| r.venue.chars().count().min(MAX_VENUE_WIDTH))
        .max()
        .unwrap_or(0)
        .max("Venue".len());
    let court_width = rows
        .iter()
        .map(|r| r.court.chars().count().min(MAX_COURT_WIDTH))
        .max()
        .unwrap_or(0)
        .max("Court".len());

    println!("{:<vw$}  {:<cw$}  Available Slot(s)", "Venue", "Court", vw = venue_width, cw = court_width);
    println!("{}  {}  {}", "-".repeat(venue_width), "-".repeat(court_width), "-".repeat(17));
    for r in rows {
        println!(
            "{:<vw$}  {:<cw$}  {}",
            truncate_string(&r.venue, MAX_VENUE_WIDTH),
            truncate_string(&r.court, MAX_COURT_WIDTH),
            r.slots,
            vw = venue_width,
            cw = court_width
        );
    }
}
