//! Chunked two-phase upload of one folder.

use ap308_ingest::{file_name, list_csv_files, prepare_clean_file, FolderLayout, SortMode, UploadUnit};
use tracing::{info, warn};

use crate::api::{CheckRequest, ImportApi, LinesRequest};
use crate::error::UploadError;
use crate::retry::RetryPolicy;
use crate::totals::{RunSummary, UploadTotals};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub chunk_size: usize,
    pub sort: SortMode,
    pub return_rows: bool,
    pub continue_on_error: bool,
    pub retry: RetryPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sort: SortMode::Default,
            return_rows: false,
            continue_on_error: false,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct UploadBatcher<A> {
    api: A,
    options: UploadOptions,
}

impl<A: ImportApi> UploadBatcher<A> {
    pub fn new(api: A, options: UploadOptions) -> Self {
        Self { api, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Upload one file's units, chunk after chunk.
    ///
    /// For every chunk the check call resolves before the lines call is
    /// issued, and the next chunk starts only after both. Any failure aborts
    /// the rest of the file.
    pub async fn upload_units(
        &self,
        source_folder: &str,
        source_file: &str,
        units: &[UploadUnit],
    ) -> Result<UploadTotals, UploadError> {
        let chunk_size = self.options.chunk_size.max(1);
        let chunk_count = units.len().div_ceil(chunk_size);
        let retry = &self.options.retry;
        let mut totals = UploadTotals::new(source_file);

        for (i, chunk) in units.chunks(chunk_size).enumerate() {
            let check_req = CheckRequest::new(source_folder, source_file, self.options.return_rows, chunk);
            let check = retry.run("check", || self.api.check(&check_req)).await?;

            let lines_req = LinesRequest::new(self.options.return_rows, chunk);
            let lines = retry.run("lines", || self.api.upsert_lines(&lines_req)).await?;

            println!(
                "    chunk {}/{}: {} row(s) | inserted {} changed {} unchanged {} | upserted {} skipped {}",
                i + 1,
                chunk_count,
                chunk.len(),
                check.inserted,
                check.changed,
                check.unchanged,
                lines.upserted,
                lines.skipped_missing_observed
            );
            totals.add_chunk(chunk.len(), check, lines);
        }

        Ok(totals)
    }

    /// Upload every clean file of the folder.
    ///
    /// Files that cannot be read as a table are skipped. Upload failures
    /// abort the run unless `continue_on_error` is set, in which case they
    /// are recorded in `failed_files` and excluded from the totals.
    pub async fn upload_folder(&self, layout: &FolderLayout) -> Result<RunSummary, UploadError> {
        let clean_dir = layout.clean_dir();
        let files = list_csv_files(&clean_dir)?;
        println!("Found {} clean file(s) in {}", files.len(), clean_dir.display());

        let mut summary = RunSummary::default();
        for path in files {
            let name = file_name(&path);

            let prepared = match prepare_clean_file(layout.folder(), &path, self.options.sort) {
                Ok(p) => p,
                Err(e) if e.is_structural() => {
                    warn!(file = %name, error = %e, "skipping file");
                    eprintln!("\n[{}] ✗ Skipped: {}", name, e);
                    summary.skip_file(&name, e.to_string());
                    continue;
                }
                Err(e) if self.options.continue_on_error => {
                    eprintln!("\n[{}] ✗ Failed: {}", name, e);
                    summary.fail_file(&name, e.to_string());
                    continue;
                }
                Err(e) => return Err(UploadError::from(e).in_file(&name)),
            };

            if !prepared.anomalies.is_empty() {
                warn!(
                    file = %name,
                    count = prepared.anomalies.len(),
                    "values kept without normalization"
                );
            }

            println!(
                "\n[{}] {} row(s) in chunk(s) of {}",
                name,
                prepared.units.len(),
                self.options.chunk_size
            );

            match self.upload_units(layout.folder(), &name, &prepared.units).await {
                Ok(totals) => {
                    info!(file = %name, rows = totals.rows, "file uploaded");
                    println!("  ✓ Uploaded {} row(s)", totals.rows);
                    summary.add_file(totals);
                }
                Err(e) if self.options.continue_on_error => {
                    eprintln!("  ✗ Failed: {}", e);
                    summary.fail_file(&name, e.to_string());
                }
                Err(e) => return Err(e.in_file(&name)),
            }
        }

        Ok(summary)
    }
}
