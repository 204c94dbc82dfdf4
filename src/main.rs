use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use tracing_subscriber::EnvFilter;

use booking_warehouse::{extract_batch, open_warehouse, Pipeline};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: booking-warehouse <warehouse.db> <bookings.csv> [more.csv ...]");
    }

    let db_path = PathBuf::from(&args[0]);
    let inputs: Vec<PathBuf> = args[1..].iter().map(PathBuf::from).collect();

    let batch = extract_batch(&inputs)?;
    let conn = open_warehouse(&db_path)?;
    let summary = Pipeline::new(conn).run(batch)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
