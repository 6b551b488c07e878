//! CSV batch writing and merging.
//!
//! Each result page is written to its own batch file with a header row.
//! The merger writes the header once, appends data rows in page order, and
//! deletes each batch file as soon as it has been merged, so batch files
//! only exist between page-write and merge-completion.

use crate::error::{Error, Result};
use crate::query::{QuerySpec, ResultPage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write one page of results as a standalone CSV batch file.
pub fn write_batch(
    dir: &Path,
    spec: &QuerySpec,
    page_index: u32,
    page: &ResultPage,
) -> Result<PathBuf> {
    let path = dir.join(format!("{}-page-{:04}.csv", spec.id, page_index));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(spec.columns)?;
    for row in &page.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    debug!(
        query = spec.id,
        page = page_index,
        rows = page.rows.len(),
        path = %path.display(),
        "batch written"
    );
    Ok(path)
}

/// Concatenate batch files into the final per-query CSV.
///
/// The header comes from the first batch only; every batch file is removed
/// after its rows are appended. Returns the merged data-row count, which
/// equals the sum of the page row counts.
pub fn merge_batches(batches: &[PathBuf], output_path: &Path) -> Result<u64> {
    if batches.is_empty() {
        return Err(Error::Other("no batch files to merge".to_string()));
    }

    let mut writer = csv::Writer::from_path(output_path)?;
    let mut rows = 0u64;

    for (index, batch) in batches.iter().enumerate() {
        let mut reader = csv::Reader::from_path(batch)?;
        if index == 0 {
            writer.write_record(reader.headers()?)?;
        }
        for record in reader.records() {
            writer.write_record(&record?)?;
            rows += 1;
        }
        fs::remove_file(batch)?;
    }

    writer.flush()?;
    debug!(rows, path = %output_path.display(), "batches merged");
    Ok(rows)
}
