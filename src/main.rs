//! Wardstat CLI: sync a remote visit export and query dashboard views.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use wardstat_lib::config::{self, SyncConfig};
use wardstat_lib::dashboard::Dashboard;
use wardstat_lib::pipeline::ingest::{local_instant, parse_his_datetime, SyncEvent};

#[derive(Parser)]
#[command(name = "wardstat")]
#[command(about = "Hospital visit statistics: sync a CSV export, query dashboard views")]
#[command(version)]
struct Cli {
    /// Visit store file (defaults to ~/Wardstat/visits.db)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the store with the export of a remote resource
    Sync {
        /// Opaque resource id substituted into the export URL
        resource_id: String,
        /// Records per insert transaction
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Print dashboard views as JSON
    Query {
        /// First admission day, yyyyMMdd or yyyyMMddHHmmss
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Last admission day (inclusive), yyyyMMdd or yyyyMMddHHmmss
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Show the most recent sync run
    Status,
}

#[tokio::main]
async fn main() {
    wardstat_lib::init_tracing();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(config::database_path);

    let mut sync_config = SyncConfig::from_env();
    if let Commands::Sync {
        batch_size: Some(size),
        ..
    } = &cli.command
    {
        sync_config.batch_size = (*size).max(1);
    }

    let mut dashboard = match Dashboard::open(&db_path, sync_config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: cannot open {}: {e}", db_path.display());
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Sync { resource_id, .. } => {
            let observer = |event: SyncEvent| {
                if let SyncEvent::Log { line } = event {
                    eprintln!("{line}");
                }
            };
            let report = dashboard.sync(&resource_id, &observer).await;
            print_json(&report, true);
            if !report.success {
                process::exit(1);
            }
        }
        Commands::Query { from, to, pretty } => {
            let start = from.as_deref().map(|raw| parse_bound(raw, false));
            let end = to.as_deref().map(|raw| parse_bound(raw, true));
            match dashboard.query(start, end) {
                Ok(report) => print_json(&report, pretty),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        Commands::Status => match dashboard.last_sync() {
            Ok(Some(run)) => print_json(&run, true),
            Ok(None) => println!("No sync has run yet."),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
    }
}

/// Date bound as epoch millis. A bare `--to` day covers the whole day.
fn parse_bound(raw: &str, end_of_day: bool) -> i64 {
    let raw = raw.trim();
    let full = if end_of_day && raw.len() == 8 {
        format!("{raw}235959")
    } else {
        raw.to_string()
    };
    match parse_his_datetime(&full).and_then(local_instant) {
        Some(instant) => instant,
        None => {
            eprintln!("Error: invalid date '{raw}', expected yyyyMMdd or yyyyMMddHHmmss");
            process::exit(2);
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match output {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error formatting output: {e}");
            process::exit(1);
        }
    }
}
