//! Check a single coverage extract before a movement run
//!
//! Usage: cargo run --bin check_snapshot -- extract.csv
//!
//! Reports duplicate coverage keys and unrecognised status codes. Exits
//! non-zero when the extract would abort a classification run.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use inforce_movements::{
    diff::{index_snapshot, DiffScope},
    records::{load_snapshot, LoadOptions},
    MovementError, SnapshotPeriod,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "check_snapshot")]
#[command(about = "Check a coverage extract for duplicate keys and unknown status codes", long_about = None)]
struct Cli {
    /// Coverage extract (CSV)
    path: PathBuf,

    /// Treat unrecognised status codes as errors
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Period and date are irrelevant to the checks
    let options = LoadOptions {
        strict_status_codes: cli.strict,
    };
    let snapshot = load_snapshot(&cli.path, SnapshotPeriod::Current, NaiveDate::MIN, options)
        .with_context(|| format!("failed to load {}", cli.path.display()))?;

    let base = snapshot.records.iter().filter(|r| r.is_base_coverage).count();
    println!("{}: {} records ({} base coverages)", cli.path.display(), snapshot.len(), base);

    let mut unknown: BTreeMap<String, usize> = BTreeMap::new();
    for record in snapshot.unknown_status_records() {
        *unknown.entry(record.status_code.to_string()).or_insert(0) += 1;
    }
    for (code, count) in &unknown {
        println!("  unrecognised status code '{}': {} records", code, count);
    }

    match index_snapshot(&snapshot, DiffScope::AllCoverages) {
        Ok(index) => println!("  {} distinct coverage keys", index.len()),
        Err(MovementError::DuplicateKey { keys, .. }) => {
            for key in &keys {
                println!("  duplicate key {}", key);
            }
            bail!("{} duplicate coverage keys", keys.len());
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
