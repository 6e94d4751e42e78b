//! Progress reporting for the keyspace scan
//!
//! Provides real-time progress display using indicatif progress bars.

use crate::scanner::ScanProgress;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress) {
        let msg = format!(
            "Scanned: {} | Processed: {} | Skipped: {} | Size: {} | Rate: {:.0}/s | Queue: {}",
            format_number(progress.keys_scanned),
            format_number(progress.keys_recorded),
            format_number(progress.keys_skipped),
            format_size(progress.bytes, BINARY),
            progress.keys_per_second(),
            progress.queue_len,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the scan
pub fn print_header(target: &str, pattern: &str, workers: usize, export: Option<&Path>) {
    println!();
    println!(
        "{} {}",
        style("redis-inventory").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Target:").bold(), target);
    println!("  {} {}", style("Pattern:").bold(), pattern);
    println!("  {} {}", style("Workers:").bold(), workers);
    if let Some(path) = export {
        println!("  {} {}", style("Export:").bold(), path.display());
    }
    println!();
}

/// Print the connection status line
pub fn print_connected(target: &str) {
    println!("{} Connected to {}", style("✔").green().bold(), target);
}

/// Print a summary of the scan itself (not of its findings)
pub fn print_scan_summary(
    keys_scanned: u64,
    keys_recorded: u64,
    keys_skipped: u64,
    duration: Duration,
) {
    let secs = duration.as_secs_f64();
    let rate = if secs > 0.0 {
        keys_scanned as f64 / secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Scan Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Keys scanned:").bold(), format_number(keys_scanned));
    println!("  {} {}", style("Keys processed:").bold(), format_number(keys_recorded));
    if keys_skipped > 0 {
        println!(
            "  {} {}",
            style("Keys skipped:").yellow().bold(),
            format_number(keys_skipped)
        );
    }
    println!(
        "  {} {:.1}s ({:.0} keys/sec)",
        style("Duration:").bold(),
        secs,
        rate
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}
