//! Hasher Service - Stage 2 of the AP308 pipeline
//!
//! Responsibilities:
//! - Read clean tables from `<data>/<folder>/clean_csv/`
//! - Normalize money, dates and text into the twelve canonical fields
//! - Compute anchor and content hashes for every row
//! - Sort deterministically and assign stable row numbers
//! - Write `<data>/<folder>/hashed/<file>.csv` plus an anomaly report
//!
//! CRITICAL: This stage must be DETERMINISTIC
//! Same clean CSV = same hashed CSV, byte for byte
//!
//! Usage:
//!   cargo run --bin hash-ap308 -- --folder 2024-06
//!   cargo run --bin hash-ap308 -- --folder 2024-06 --sort none

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ap308_ingest::{
    file_name, list_csv_files, logging, prepare_clean_file, Field, FolderLayout, PreparedFile,
    SortMode,
};
use clap::Parser;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "hash-ap308", about = "Normalizes and hashes clean AP308 tables")]
struct Args {
    /// Folder name under the data root
    #[arg(long)]
    folder: String,

    /// Row ordering: default | none
    #[arg(long, default_value = "default")]
    sort: SortMode,

    /// Debug-level diagnostics
    #[arg(long, short, default_value = "false")]
    verbose: bool,
}

/// Write units as CSV: identity columns, then the canonical fields.
fn write_hashed_csv<W: Write>(prepared: &PreparedFile, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["stable_row_num", "source_row_key", "anchor_hash", "content_hash"];
    header.extend(Field::ALL.iter().map(|f| f.name()));
    wtr.write_record(&header)?;

    for unit in &prepared.units {
        let mut record = vec![
            unit.stable_row_num.to_string(),
            unit.source_row_key.clone(),
            unit.anchor_hash.clone(),
            unit.content_hash.clone(),
        ];
        record.extend(Field::ALL.iter().map(|f| unit.data.text(*f).to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_outputs(prepared: &PreparedFile, out_dir: &Path) -> Result<()> {
    let csv_path = out_dir.join(&prepared.source_file);
    let file = fs::File::create(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;
    write_hashed_csv(prepared, file)?;

    let stem = Path::new(&prepared.source_file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| prepared.source_file.clone());
    let report_path = out_dir.join(format!("{}.anomalies.json", stem));

    if prepared.anomalies.is_empty() {
        // a stale report from an earlier run would be misleading
        if report_path.exists() {
            fs::remove_file(&report_path)?;
        }
    } else {
        let json = serde_json::to_string_pretty(&prepared.anomalies)?;
        fs::write(&report_path, json)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct HashSummary {
    files: usize,
    rows: usize,
    anomalies: usize,
    skipped: Vec<(String, String)>,
}

fn hash_folder(layout: &FolderLayout, mode: SortMode) -> Result<HashSummary> {
    let clean_dir = layout.clean_dir();
    let out_dir = layout.hashed_dir();
    let files = list_csv_files(&clean_dir).context("Run clean-ap308 first")?;
    println!("Found {} clean file(s) in {}", files.len(), clean_dir.display());

    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut summary = HashSummary::default();
    for path in files {
        let name = file_name(&path);
        let prepared = match prepare_clean_file(layout.folder(), &path, mode) {
            Ok(p) => p,
            Err(e) if e.is_structural() => {
                warn!(file = %name, error = %e, "skipping file");
                eprintln!("  ✗ {}: {}", name, e);
                summary.skipped.push((name, e.to_string()));
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", name)),
        };

        write_outputs(&prepared, &out_dir)?;
        println!(
            "  ✓ {}: {} row(s), {} anomaly(ies)",
            name,
            prepared.units.len(),
            prepared.anomalies.len()
        );
        summary.files += 1;
        summary.rows += prepared.units.len();
        summary.anomalies += prepared.anomalies.len();
    }

    Ok(summary)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(args.verbose);

    let layout = FolderLayout::from_env(&args.folder);

    println!("=== AP308 Hasher ===");
    println!("Folder: {}", layout.folder());
    println!("Sort: {}", args.sort);

    let summary = hash_folder(&layout, args.sort)?;

    println!("\n=== Hashing Summary ===");
    println!("Files: {}", summary.files);
    println!("Rows: {}", summary.rows);
    println!("Anomalies: {}", summary.anomalies);
    println!("Skipped: {}", summary.skipped.len());
    for (file, error) in &summary.skipped {
        println!("  - {}: {}", file, error);
    }
    println!("Ready for upload: cargo run --bin upload-ap308 -- --folder {}", args.folder);

    Ok(())
}
