//! Scan coordinator - orchestrates the parallel keyspace scan
//!
//! The coordinator is responsible for:
//! - Opening and verifying the scanning connection
//! - Setting up the key queue and workers
//! - Running the SCAN producer on the calling thread
//! - Closing the queue and joining every worker
//! - Handing the quiesced aggregators back as a [`ScanResult`]

use crate::config::ScanConfig;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::scanner::key_stream::KeyStream;
use crate::scanner::queue::{KeyQueue, KeyQueueSender};
use crate::scanner::worker::{aggregate_stats, Worker};
use crate::stats::{DuplicateIndex, TtlAggregator, TtlSnapshot};
use crate::store::{KeyStore, StoreConnector};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Keys between two progress refreshes
const PROGRESS_INTERVAL: u64 = 1000;

/// Result of a completed scan
#[derive(Debug)]
pub struct ScanResult {
    /// Final TTL histogram
    pub ttl: TtlSnapshot,

    /// Final duplicate index
    pub duplicates: Arc<DuplicateIndex>,

    /// Keys returned by SCAN
    pub keys_scanned: u64,

    /// Keys whose TTL and value were both fetched
    pub keys_recorded: u64,

    /// Keys dropped because a fetch failed
    pub keys_skipped: u64,

    /// Sum of recorded value sizes
    pub total_bytes: u64,

    /// SCAN calls made
    pub pages: u64,

    /// Wall-clock start
    pub started_at: DateTime<Utc>,

    /// Time taken for the scan
    pub duration: Duration,
}

/// Progress information for display
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Keys returned by SCAN so far
    pub keys_scanned: u64,

    /// Keys recorded by workers so far
    pub keys_recorded: u64,

    /// Keys skipped by workers so far
    pub keys_skipped: u64,

    /// Bytes recorded so far
    pub bytes: u64,

    /// Keys waiting in the queue
    pub queue_len: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate processed keys per second
    pub fn keys_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.keys_recorded + self.keys_skipped) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Coordinates the parallel keyspace scan
pub struct ScanCoordinator<C: StoreConnector> {
    /// Configuration
    config: Arc<ScanConfig>,

    /// Opens worker connections
    connector: C,

    /// Connection used by the SCAN producer
    scan_conn: C::Conn,

    /// Shared TTL histogram
    ttl_stats: Arc<TtlAggregator>,

    /// Shared duplicate index
    duplicates: Arc<DuplicateIndex>,
}

impl<C: StoreConnector> ScanCoordinator<C> {
    /// Connect to the store and verify it answers
    ///
    /// Fails before any scanning if the store is unreachable or rejects
    /// the credentials.
    pub fn connect(config: ScanConfig, connector: C) -> Result<Self> {
        let mut scan_conn = connector.connect()?;
        scan_conn.ping()?;

        debug!(store = %connector.describe(), "Store connection verified");

        let ttl_stats = Arc::new(TtlAggregator::new(config.short_ttl_secs));

        Ok(Self {
            config: Arc::new(config),
            connector,
            scan_conn,
            ttl_stats,
            duplicates: Arc::new(DuplicateIndex::new()),
        })
    }

    /// Human-readable scan target
    pub fn target(&self) -> String {
        self.connector.describe()
    }

    /// Run the scan to completion
    pub fn run(mut self, progress: Option<&ProgressReporter>) -> Result<ScanResult> {
        let start_time = Instant::now();
        let started_at = Utc::now();

        info!(
            store = %self.connector.describe(),
            pattern = %self.config.pattern,
            workers = self.config.worker_count,
            "Starting keyspace scan"
        );

        let queue = KeyQueue::new(self.config.queue_size);
        let mut workers = self.spawn_workers(&queue)?;
        let sender = queue.into_sender();

        let produced = produce(
            &mut self.scan_conn,
            &self.config,
            &sender,
            &workers,
            progress,
            start_time,
        );

        // Closing the queue lets workers drain and exit
        drop(sender);
        join_workers(&mut workers)?;

        let (keys_scanned, pages) = match produced {
            Ok(counts) => counts,
            Err(e) => {
                error!(error = %e, "Scan aborted");
                return Err(e);
            }
        };

        let totals = aggregate_stats(&workers);
        let duration = start_time.elapsed();
        let ttl = self.ttl_stats.snapshot();

        if let Some(p) = progress {
            p.update(&ScanProgress {
                keys_scanned,
                keys_recorded: totals.recorded,
                keys_skipped: totals.skipped,
                bytes: totals.bytes,
                queue_len: 0,
                elapsed: duration,
            });
        }

        info!(
            keys = keys_scanned,
            recorded = totals.recorded,
            skipped = totals.skipped,
            bytes = totals.bytes,
            pages = pages,
            fingerprints = self.duplicates.len(),
            duration_secs = duration.as_secs(),
            "Scan completed"
        );

        Ok(ScanResult {
            ttl,
            duplicates: self.duplicates,
            keys_scanned,
            keys_recorded: totals.recorded,
            keys_skipped: totals.skipped,
            total_bytes: totals.bytes,
            pages,
            started_at,
            duration,
        })
    }

    /// Open one connection per worker and spawn the threads
    fn spawn_workers(&self, queue: &KeyQueue) -> Result<Vec<Worker>> {
        let mut workers = Vec::with_capacity(self.config.worker_count);

        for id in 0..self.config.worker_count {
            let worker = Worker::spawn(
                id,
                &self.connector,
                queue.receiver(),
                Arc::clone(&self.ttl_stats),
                Arc::clone(&self.duplicates),
            )?;
            workers.push(worker);
        }

        info!(count = workers.len(), "Workers spawned");
        Ok(workers)
    }
}

/// Feed every key from SCAN into the queue; returns (keys, pages)
fn produce<S: KeyStore>(
    conn: &mut S,
    config: &ScanConfig,
    sender: &KeyQueueSender,
    workers: &[Worker],
    progress: Option<&ProgressReporter>,
    start_time: Instant,
) -> Result<(u64, u64)> {
    let mut stream = KeyStream::new(conn, config.pattern.as_str(), config.scan_count);

    while let Some(key) = stream.next() {
        sender.send(key?)?;

        if stream.keys_yielded() % PROGRESS_INTERVAL == 0 {
            let totals = aggregate_stats(workers);
            let snapshot = ScanProgress {
                keys_scanned: stream.keys_yielded(),
                keys_recorded: totals.recorded,
                keys_skipped: totals.skipped,
                bytes: totals.bytes,
                queue_len: sender.len(),
                elapsed: start_time.elapsed(),
            };
            match progress {
                Some(p) => p.update(&snapshot),
                None => debug!(
                    scanned = snapshot.keys_scanned,
                    processed = snapshot.keys_recorded + snapshot.keys_skipped,
                    "Scan progress"
                ),
            }
        }
    }

    Ok((stream.keys_yielded(), stream.pages_fetched()))
}

/// Join all worker threads
///
/// Every worker is joined even if one of them panicked; the first panic
/// is reported.
fn join_workers(workers: &mut [Worker]) -> Result<()> {
    let mut first_failure = None;

    for worker in workers.iter_mut() {
        if let Err(e) = worker.join() {
            warn!(worker = worker.id(), error = %e, "Worker failed to join cleanly");
            first_failure.get_or_insert(e);
        }
    }

    match first_failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_progress_rate() {
        let progress = ScanProgress {
            keys_scanned: 12_000,
            keys_recorded: 9_000,
            keys_skipped: 1_000,
            bytes: 1024 * 1024,
            queue_len: 500,
            elapsed: Duration::from_secs(10),
        };

        assert!((progress.keys_per_second() - 1000.0).abs() < 0.1);
    }

    #[test]
    fn test_scan_progress_zero_elapsed() {
        let progress = ScanProgress::default();
        assert_eq!(progress.keys_per_second(), 0.0);
    }
}
