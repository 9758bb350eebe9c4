//! Register Converter - legacy AP register export to JSON records
//!
//! Responsibilities:
//! - Clean one or more register exports (same report layout as AP308)
//! - Normalize every line into the canonical ledger fields
//! - Emit each distinct line once, in input order
//!
//! Usage:
//!   cargo run --bin convert-ap-register -- --input register.csv --output register.json
//!   cargo run --bin convert-ap-register -- --input jan.csv --input feb.csv --output q1.json

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ap308_ingest::{clean_raw_file, logging, NormalizedRecord, RegisterConversion, RegisterStats, RowCleaner};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "convert-ap-register", about = "Converts legacy AP register exports to JSON")]
struct Args {
    /// Register export(s) to convert (repeatable)
    #[arg(long, required = true)]
    input: Vec<PathBuf>,

    /// JSON file to write
    #[arg(long)]
    output: PathBuf,

    /// Debug-level diagnostics
    #[arg(long, short, default_value = "false")]
    verbose: bool,
}

/// One conversion run; duplicate lines across all inputs are emitted once.
fn convert(inputs: &[PathBuf], cleaner: &RowCleaner) -> Result<(Vec<NormalizedRecord>, RegisterStats)> {
    let mut run = RegisterConversion::new();
    for path in inputs {
        let table = clean_raw_file(path, cleaner)
            .with_context(|| format!("Failed to clean {}", path.display()))?;
        run.push_table(&table)
            .with_context(|| format!("Failed to map columns of {}", path.display()))?;
        info!(file = %path.display(), rows_out = run.stats().rows_out, "converted");
    }
    Ok(run.finish())
}

fn write_json(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(args.verbose);

    println!("=== AP Register Converter ===");
    println!("Inputs: {}", args.input.len());

    let (records, stats) = convert(&args.input, &RowCleaner::new())?;
    write_json(&args.output, &records)?;

    println!("\n=== Conversion Summary ===");
    println!("Rows read: {}", stats.rows_in);
    println!("Rows written: {}", stats.rows_out);
    println!("Duplicates dropped: {}", stats.duplicates);
    println!("Anomalies kept as-is: {}", stats.anomalies);
    println!("Output: {}", args.output.display());

    Ok(())
}
