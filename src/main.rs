//! redis-inventory - Keyspace TTL and duplicate-value inventory for Redis
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use redis_inventory::config::{CliArgs, ScanConfig};
use redis_inventory::progress::{print_connected, print_header, print_scan_summary, ProgressReporter};
use redis_inventory::report::{
    export_duplicates, print_duplicates, print_export_done, print_ttl_summary,
};
use redis_inventory::scanner::ScanCoordinator;
use redis_inventory::store::{RedisConnector, StoreConnector};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    let connector = RedisConnector::new(&config).context("Invalid connection settings")?;
    let target = connector.describe();

    // Print header
    if config.show_progress {
        print_header(
            &target,
            &config.pattern,
            config.worker_count,
            config.export_path.as_deref(),
        );
    }

    // Create progress reporter
    let progress = if config.show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };

    if let Some(ref p) = progress {
        p.set_status("Connecting to Redis...");
    }

    let export_path = config.export_path.clone();
    let show_progress = config.show_progress;

    let coordinator = ScanCoordinator::connect(config, connector)
        .with_context(|| format!("Failed to connect to {}", target))?;

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }
    print_connected(&target);

    // Fresh spinner for the scan itself
    let progress = if show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };

    // Run the scan
    let result = coordinator.run(progress.as_ref()).context("Scan failed")?;

    // Finish progress
    if let Some(ref p) = progress {
        p.finish("Scan completed");
    }

    if show_progress {
        print_scan_summary(
            result.keys_scanned,
            result.keys_recorded,
            result.keys_skipped,
            result.duration,
        );
    }

    info!(
        started = %result.started_at.to_rfc3339(),
        pages = result.pages,
        bytes = result.total_bytes,
        "Inventory finished"
    );

    print_ttl_summary(&result.ttl);

    match export_path {
        Some(path) => {
            let rows = export_duplicates(&path, &result.duplicates)
                .context("CSV export failed")?;
            info!(rows, path = %path.display(), "Duplicate groups exported");
            print_export_done(&path, rows);
        }
        None => print_duplicates(&result.duplicates),
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("redis_inventory=debug,warn")
    } else {
        EnvFilter::new("redis_inventory=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
