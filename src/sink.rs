//! CSV result sink for classified movements

use crate::classify::MovementRecord;
use crate::error::Result;
use crate::runner::RunSummary;
use csv::Writer;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write movement records as CSV, one row per record, null fields left empty
pub fn write_movements<W: Write>(writer: W, movements: &[MovementRecord]) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for movement in movements {
        csv_writer.serialize(movement)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_movements_to_path<P: AsRef<Path>>(path: P, movements: &[MovementRecord]) -> Result<()> {
    let path = path.as_ref();
    write_movements(File::create(path)?, movements)?;
    info!("Wrote {} movements to {}", movements.len(), path.display());
    Ok(())
}

/// Write the run summary as pretty-printed JSON
pub fn write_summary_to_path<P: AsRef<Path>>(path: P, summary: &RunSummary) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
