//! Inforce movements CLI
//!
//! Classifies policy movements between two inforce snapshots and writes the
//! movement records (and optionally a JSON run summary).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use inforce_movements::{
    records::{load_contract_registry, load_snapshot},
    sink::{write_movements_to_path, write_summary_to_path},
    MovementRunner, PrecedencePolicy, RunConfig, SnapshotPeriod,
};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PrecedenceArg {
    PreferFullCoverage,
    PreferBaseCoverage,
    Error,
}

impl From<PrecedenceArg> for PrecedencePolicy {
    fn from(arg: PrecedenceArg) -> Self {
        match arg {
            PrecedenceArg::PreferFullCoverage => PrecedencePolicy::PreferFullCoverage,
            PrecedenceArg::PreferBaseCoverage => PrecedencePolicy::PreferBaseCoverage,
            PrecedenceArg::Error => PrecedencePolicy::Error,
        }
    }
}

#[derive(Parser)]
#[command(name = "inforce_movements")]
#[command(about = "Classify policy movements between two inforce snapshots", long_about = None)]
struct Cli {
    /// Previous period coverage extract (CSV)
    #[arg(long)]
    previous: PathBuf,

    /// Valuation date of the previous extract (YYYY-MM-DD)
    #[arg(long)]
    previous_date: NaiveDate,

    /// Current period coverage extract (CSV)
    #[arg(long)]
    current: PathBuf,

    /// Valuation date of the current extract (YYYY-MM-DD)
    #[arg(long)]
    current_date: NaiveDate,

    /// Contract registry extract (CSV, ContractID column)
    #[arg(long)]
    registry: PathBuf,

    /// Output path for movement records
    #[arg(long, default_value = "movements.csv")]
    output: PathBuf,

    /// Optional output path for the JSON run summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Run configuration (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tie-break when full-coverage and base-coverage rules disagree
    #[arg(long, value_enum)]
    precedence: Option<PrecedenceArg>,

    /// Classify on all cores
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Reject unrecognised status codes
    #[arg(long, default_value_t = false)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    let mut config = match &cli.config {
        Some(path) => RunConfig::from_json_path(path)
            .with_context(|| format!("failed to read run config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(precedence) = cli.precedence {
        config.precedence = precedence.into();
    }
    config.parallel |= cli.parallel;
    config.strict_status_codes |= cli.strict;
    info!("Run config: {:?}", config);

    let options = config.load_options();
    let previous = load_snapshot(&cli.previous, SnapshotPeriod::Previous, cli.previous_date, options)
        .with_context(|| format!("failed to load previous snapshot {}", cli.previous.display()))?;
    let current = load_snapshot(&cli.current, SnapshotPeriod::Current, cli.current_date, options)
        .with_context(|| format!("failed to load current snapshot {}", cli.current.display()))?;
    let registry = load_contract_registry(&cli.registry)
        .with_context(|| format!("failed to load contract registry {}", cli.registry.display()))?;
    println!(
        "Loaded {} previous / {} current records, {} contracts in {:?}",
        previous.len(),
        current.len(),
        registry.len(),
        start.elapsed()
    );

    let runner = MovementRunner::from_config(&config);
    let run = runner
        .run(&previous, &current, &registry)
        .context("movement classification failed; no output written")?;

    write_movements_to_path(&cli.output, &run.movements)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    if let Some(path) = &cli.summary {
        write_summary_to_path(path, &run.summary)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let summary = &run.summary;
    println!("\nMovement Summary ({} -> {}):", summary.previous_valuation_date, summary.current_valuation_date);
    println!("  Added: {}  Removed: {}  Common: {}", summary.added, summary.removed, summary.common);
    println!("  Base added: {}  Base removed: {}", summary.base_added, summary.base_removed);
    println!(
        "  Evaluated: {}  Movements: {}  No movement: {}",
        summary.classification.evaluated, summary.classification.emitted, summary.classification.no_movement
    );
    for (label, count) in &summary.movement_counts {
        println!("  {:<26} {:>8}", label, count);
    }
    println!("\nMovements written to: {}", cli.output.display());
    println!("Total time: {:?}", start.elapsed());

    Ok(())
}
