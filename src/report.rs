//! Scan findings: TTL summary, duplicate groups and CSV export
//!
//! Everything here reads the aggregators after the scan has quiesced.
//! Only groups holding more than one key are ever reported.

use crate::error::{ExportError, ExportResult};
use crate::stats::{DupGroup, DuplicateIndex, TtlSnapshot};
use console::style;
use humansize::{format_size, BINARY};
use std::fs::File;
use std::path::Path;

/// CSV header
pub const EXPORT_HEADER: [&str; 3] = ["count", "size_kb", "sample"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Bytes as MiB
pub fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// One exported duplicate group
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub count: u64,
    pub size_kb: f64,
    pub sample: String,
}

impl From<DupGroup> for ExportRow {
    fn from(group: DupGroup) -> Self {
        Self {
            count: group.count,
            size_kb: group.size_kb(),
            sample: group.sample,
        }
    }
}

impl ExportRow {
    fn record(&self) -> [String; 3] {
        [
            self.count.to_string(),
            format!("{:.2}", self.size_kb),
            self.sample.clone(),
        ]
    }
}

/// Duplicate groups as export rows, largest first
///
/// Rows with equal size are ordered by sample key.
pub fn export_rows(index: &DuplicateIndex) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = index
        .duplicate_groups()
        .into_iter()
        .map(ExportRow::from)
        .collect();

    rows.sort_by(|a, b| {
        b.size_kb
            .total_cmp(&a.size_kb)
            .then_with(|| a.sample.cmp(&b.sample))
    });
    rows
}

/// Write rows as CSV with a `count,size_kb,sample` header
pub fn write_csv(path: &Path, rows: &[ExportRow]) -> ExportResult<()> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let write_err = |reason: String| ExportError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);
    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| write_err(e.to_string()))?;

    for row in rows {
        writer
            .write_record(row.record())
            .map_err(|e| write_err(e.to_string()))?;
    }

    writer.flush().map_err(|e| write_err(e.to_string()))?;
    Ok(())
}

/// Sort the duplicate groups and write them to `path`
///
/// Returns the number of rows written.
pub fn export_duplicates(path: &Path, index: &DuplicateIndex) -> ExportResult<usize> {
    let rows = export_rows(index);
    write_csv(path, &rows)?;
    Ok(rows.len())
}

/// Lines of the TTL summary, without styling
pub fn ttl_summary_lines(snapshot: &TtlSnapshot) -> Vec<String> {
    let mut lines: Vec<String> = snapshot
        .iter()
        .map(|(bucket, stats)| {
            format!(
                "{}: {} ({:.2} MB)",
                bucket.label(),
                stats.count,
                to_mb(stats.bytes)
            )
        })
        .collect();

    lines.push(format!("Total Size: {:.2} MB", to_mb(snapshot.total_bytes())));
    lines
}

/// Lines of the duplicate summary, in index iteration order
pub fn duplicate_lines(index: &DuplicateIndex) -> Vec<String> {
    index
        .duplicate_groups()
        .into_iter()
        .map(|group| {
            format!(
                "Count: {}, Size: {:.2} KB, Sample: {}",
                group.count,
                group.size_kb(),
                group.sample
            )
        })
        .collect()
}

/// Print the TTL histogram
pub fn print_ttl_summary(snapshot: &TtlSnapshot) {
    println!("{}", style("TTL Stats:").bold());
    for line in ttl_summary_lines(snapshot) {
        println!("  {}", line);
    }
    println!();
}

/// Print every duplicate group
pub fn print_duplicates(index: &DuplicateIndex) {
    let lines = duplicate_lines(index);

    println!("{}", style("Duplicate Values:").bold());
    if lines.is_empty() {
        println!("  {}", style("none found").dim());
        println!();
        return;
    }
    for line in lines {
        println!("  {}", line);
    }

    let summary = index.summary();
    println!(
        "  {}",
        style(format!(
            "{} groups, {} keys, {} reclaimable",
            summary.groups,
            summary.keys,
            format_size(summary.redundant_bytes, BINARY)
        ))
        .dim()
    );
    println!();
}

/// Print the export confirmation
pub fn print_export_done(path: &Path, rows: usize) {
    println!(
        "{} CSV export written to: {} ({} groups)",
        style("✔").green().bold(),
        path.display(),
        rows
    );
}
