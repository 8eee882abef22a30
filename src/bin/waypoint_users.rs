//!
//! waypoint user administration binary
//! -----------------------------------
//! Opens the trip database directly and runs an interactive prompt for
//! creating, listing and deleting users and resetting passwords.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use waypoint::config::{arg_value, has_flag, DEFAULT_DB_PATH, ENV_DB_PATH};
use waypoint::storage::Store;

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("waypoint user admin\n\nUSAGE:\n  waypoint_users [--db-path PATH]\n\nOPTIONS:\n  --db-path PATH   Database file (env: {}, default {})\n\n{}", ENV_DB_PATH, DEFAULT_DB_PATH, waypoint::cli::HELP);
        return Ok(());
    }

    let db_path = arg_value(&args, "--db-path")
        .map(PathBuf::from)
        .or_else(|| env::var(ENV_DB_PATH).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    let store = Store::open(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
    println!("database: {}", db_path.display());
    waypoint::cli::run_repl(&store)
}
