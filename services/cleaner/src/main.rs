//! Cleaner Service - Stage 1 of the AP308 pipeline
//!
//! Responsibilities:
//! - Read every raw AP308 export in `<data>/<folder>/*.csv`
//! - Decode legacy text, parse ragged CSV, drop banners and blank rows
//! - Merge the two-line column header and pad rows to a uniform width
//! - Write one clean table per export to `<data>/<folder>/clean_csv/`
//!
//! A file that cannot be cleaned is reported and skipped; it never aborts
//! the run.
//!
//! Usage:
//!   cargo run --bin clean-ap308 -- --folder 2024-06
//!   cargo run --bin clean-ap308 -- --folder 2024-06 --sentinel "*** CONTINUED ***"

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ap308_ingest::{clean_raw_file, file_name, list_csv_files, logging, FolderLayout, RowCleaner};
use clap::Parser;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "clean-ap308", about = "Cleans raw AP308 exports into rectangular CSV tables")]
struct Args {
    /// Folder name under the data root
    #[arg(long)]
    folder: String,

    /// Extra first-cell marker to drop (repeatable)
    #[arg(long)]
    sentinel: Vec<String>,

    /// Dry run - clean and report, write nothing
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Debug-level diagnostics
    #[arg(long, short, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, Default)]
struct CleanSummary {
    cleaned: usize,
    rows: usize,
    skipped: Vec<(String, String)>,
}

/// Clean every raw export of the folder. Structural failures are skipped.
fn clean_folder(
    raw_dir: &Path,
    out_dir: &Path,
    cleaner: &RowCleaner,
    dry_run: bool,
) -> Result<CleanSummary> {
    let files = list_csv_files(raw_dir)?;
    println!("Found {} raw file(s) in {}", files.len(), raw_dir.display());

    if !dry_run {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    let mut summary = CleanSummary::default();
    for path in files {
        let name = file_name(&path);
        match clean_raw_file(&path, cleaner) {
            Ok(table) => {
                println!(
                    "  ✓ {}: {} row(s) x {} column(s)",
                    name,
                    table.rows.len(),
                    table.width()
                );
                if !dry_run {
                    let out_path: PathBuf = out_dir.join(&name);
                    let file = fs::File::create(&out_path)
                        .with_context(|| format!("Failed to create {}", out_path.display()))?;
                    table
                        .write_csv(file)
                        .with_context(|| format!("Failed to write {}", out_path.display()))?;
                }
                summary.cleaned += 1;
                summary.rows += table.rows.len();
            }
            Err(e) if e.is_structural() => {
                warn!(file = %name, error = %e, "skipping file");
                eprintln!("  ✗ {}: {}", name, e);
                summary.skipped.push((name, e.to_string()));
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", name)),
        }
    }

    Ok(summary)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(args.verbose);

    let layout = FolderLayout::from_env(&args.folder);
    let cleaner = RowCleaner::new().with_sentinels(args.sentinel.iter().cloned());

    println!("=== AP308 Cleaner ===");
    println!("Folder: {}", layout.folder());
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let summary = clean_folder(&layout.raw_dir(), &layout.clean_dir(), &cleaner, args.dry_run)?;

    println!("\n=== Cleaning Summary ===");
    println!("Cleaned: {}", summary.cleaned);
    println!("Rows: {}", summary.rows);
    println!("Skipped: {}", summary.skipped.len());
    for (file, error) in &summary.skipped {
        println!("  - {}: {}", file, error);
    }
    if !args.dry_run {
        println!("Ready for hashing: cargo run --bin hash-ap308 -- --folder {}", args.folder);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_folder_skips_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("2024-06");
        fs::create_dir_all(&raw).unwrap();
        fs::write(
            raw.join("good.csv"),
            "VEND,INVOICE\nNO.,NUMBER\nV1,I1\nAP308,PAGE 2\nV2,I2,extra\n",
        )
        .unwrap();
        fs::write(raw.join("bad.csv"), "AP308,ONLY A BANNER\n\n").unwrap();

        let out = raw.join("clean_csv");
        let summary = clean_folder(&raw, &out, &RowCleaner::new(), false).unwrap();

        assert_eq!(summary.cleaned, 1);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "bad.csv");

        let written = fs::read_to_string(out.join("good.csv")).unwrap();
        assert_eq!(written, "VEND NO.,INVOICE NUMBER,\nV1,I1,\nV2,I2,extra\n");
        assert!(!out.join("bad.csv").exists());
    }

    #[test]
    fn test_clean_folder_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "VEND,INVOICE\nNO.,NO.\nV1,I1\n").unwrap();

        let out = dir.path().join("clean_csv");
        let summary = clean_folder(dir.path(), &out, &RowCleaner::new(), true).unwrap();
        assert_eq!(summary.cleaned, 1);
        assert!(!out.exists());
    }

    #[test]
    fn test_clean_folder_missing_raw_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = clean_folder(&dir.path().join("missing"), &dir.path().join("out"), &RowCleaner::new(), true);
        assert!(result.is_err());
    }
}
