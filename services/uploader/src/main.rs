//! Upload CLI - sends a folder's clean AP308 tables to the import API
//!
//! Usage:
//!   cargo run --bin upload-ap308 -- --folder 2024-06
//!   cargo run --bin upload-ap308 -- --folder 2024-06 --chunk 500 --continue-on-error
//!   cargo run --bin upload-ap308 -- --folder 2024-06 --dry-run
//!
//! Exit codes: 0 success, 1 configuration or unrecoverable error.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ap308_ingest::{logging, FolderLayout, SortMode};
use ap308_uploader::{
    DryRunApi, HttpApi, RetryPolicy, RunSummary, UploadBatcher, UploadOptions, UploaderConfig,
    DEFAULT_CHUNK_SIZE,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "upload-ap308", about = "Uploads clean AP308 tables to the import API")]
struct Args {
    /// Folder name under the data root (reads <folder>/clean_csv/*.csv)
    #[arg(long)]
    folder: String,

    /// Rows per check/upsert chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_chunk)]
    chunk: usize,

    /// Row ordering: default | none
    #[arg(long, default_value = "default")]
    sort: SortMode,

    /// Dry run - no network calls, counts mirror row counts
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Record failed files and keep going instead of exiting
    #[arg(long, default_value = "false")]
    continue_on_error: bool,

    /// Path to config.json with the API base URL
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Extra attempts per call on transport errors and HTTP 5xx
    #[arg(long, default_value = "2")]
    retries: u32,

    /// Ask the API to echo per-row results
    #[arg(long, default_value = "false")]
    return_rows: bool,

    /// Debug-level diagnostics
    #[arg(long, short, default_value = "false")]
    verbose: bool,
}

fn parse_chunk(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("chunk size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn print_summary(summary: &RunSummary) -> Result<()> {
    println!("\n=== Upload Summary ===");
    println!("Files uploaded: {}", summary.files.len());
    println!("Files failed: {}", summary.failed_files.len());
    println!("Files skipped: {}", summary.skipped_files.len());
    println!("{}", serde_json::to_string_pretty(summary)?);

    if !summary.failed_files.is_empty() {
        println!("\nRe-run needed for:");
        for failed in &summary.failed_files {
            println!("  - {}: {}", failed.file, failed.error);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(args.verbose);

    // Configuration errors stop the run before any file is touched
    let config = UploaderConfig::load(&args.config).context("Failed to load uploader config")?;

    let layout = FolderLayout::from_env(&args.folder);
    let options = UploadOptions {
        chunk_size: args.chunk,
        sort: args.sort,
        return_rows: args.return_rows,
        continue_on_error: args.continue_on_error,
        retry: RetryPolicy {
            retries: args.retries,
            base_delay: Duration::from_millis(500),
        },
    };

    println!("=== AP308 Uploader ===");
    println!("API: {}", config.api);
    println!("Folder: {}", layout.folder());
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });
    println!("Chunk: {} | Sort: {}", args.chunk, args.sort);

    let summary = if args.dry_run {
        UploadBatcher::new(DryRunApi, options).upload_folder(&layout).await
    } else {
        let api = HttpApi::new(&config).context("Failed to build HTTP client")?;
        UploadBatcher::new(api, options).upload_folder(&layout).await
    }
    .context("Upload aborted")?;

    print_summary(&summary)?;
    Ok(())
}
