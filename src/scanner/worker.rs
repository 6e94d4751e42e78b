//! Worker thread logic for the key pipeline
//!
//! Each worker:
//! - Owns its own store connection (opened before the thread starts)
//! - Pulls key names from the key queue until it is closed and drained
//! - Fetches TTL and value for each key
//! - Records the key in the TTL histogram and the duplicate index
//!
//! Keys whose TTL or value cannot be fetched are skipped: keys expire or
//! get deleted between SCAN and GET all the time on a live server.

use crate::content::fingerprint;
use crate::error::{KeyOutcome, WorkerError};
use crate::scanner::queue::KeyQueueReceiver;
use crate::stats::{DuplicateIndex, TtlAggregator};
use crate::store::{KeyStore, StoreConnector};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Keys applied to the aggregators
    pub keys_recorded: AtomicU64,

    /// Keys skipped because a fetch failed
    pub keys_skipped: AtomicU64,

    /// Value bytes of recorded keys
    pub bytes_recorded: AtomicU64,
}

impl WorkerStats {
    fn record_key(&self, bytes: u64) {
        self.keys_recorded.fetch_add(1, Ordering::Relaxed);
        self.bytes_recorded.fetch_add(bytes, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.keys_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Keys taken off the queue, recorded or not
    pub fn keys_seen(&self) -> u64 {
        self.keys_recorded.load(Ordering::Relaxed) + self.keys_skipped.load(Ordering::Relaxed)
    }
}

/// Summed statistics over all workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerTotals {
    pub recorded: u64,
    pub skipped: u64,
    pub bytes: u64,
}

/// Fetches and classifies one key at a time
pub struct KeyProcessor<S: KeyStore> {
    store: S,
    ttl_stats: Arc<TtlAggregator>,
    duplicates: Arc<DuplicateIndex>,
}

impl<S: KeyStore> KeyProcessor<S> {
    pub fn new(store: S, ttl_stats: Arc<TtlAggregator>, duplicates: Arc<DuplicateIndex>) -> Self {
        Self {
            store,
            ttl_stats,
            duplicates,
        }
    }

    /// Fetch, classify and record a single key
    pub fn process(&mut self, key: Vec<u8>) -> KeyOutcome {
        // Both fetches run even if the first fails; either failure skips the key.
        let ttl = self.store.ttl(&key);
        let value = self.store.get(&key);

        let (ttl, value) = match (ttl, value) {
            (Ok(ttl), Ok(value)) => (ttl, value),
            (Err(error), _) | (_, Err(error)) => return KeyOutcome::Skipped { key, error },
        };

        let size = value.len() as u64;
        self.ttl_stats.record(ttl, size);
        self.duplicates.record(fingerprint(&value), &key, ttl, size);

        KeyOutcome::Recorded { key, size }
    }
}

/// A worker thread that drains the key queue
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Open a connection and spawn a new worker thread
    ///
    /// Connection failures are reported here, before any key is queued.
    pub fn spawn<C: StoreConnector>(
        id: usize,
        connector: &C,
        queue_rx: KeyQueueReceiver,
        ttl_stats: Arc<TtlAggregator>,
        duplicates: Arc<DuplicateIndex>,
    ) -> Result<Self, WorkerError> {
        let store = connector.connect().map_err(|e| WorkerError::InitFailed {
            id,
            reason: e.to_string(),
        })?;

        let processor = KeyProcessor::new(store, ttl_stats, duplicates);
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("scanner-{}", id))
            .spawn(move || worker_loop(id, processor, queue_rx, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    ///
    /// Statistics stay readable after the join.
    pub fn join(&mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop<S: KeyStore>(
    id: usize,
    mut processor: KeyProcessor<S>,
    queue_rx: KeyQueueReceiver,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    while let Some(key) = queue_rx.recv() {
        match processor.process(key) {
            KeyOutcome::Recorded { size, .. } => stats.record_key(size),
            KeyOutcome::Skipped { .. } => stats.record_skip(),
        }
    }

    debug!(
        worker = id,
        recorded = stats.keys_recorded.load(Ordering::Relaxed),
        skipped = stats.keys_skipped.load(Ordering::Relaxed),
        "Worker finished"
    );
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> WorkerTotals {
    workers.iter().fold(WorkerTotals::default(), |mut acc, worker| {
        acc.recorded += worker.stats.keys_recorded.load(Ordering::Relaxed);
        acc.skipped += worker.stats.keys_skipped.load(Ordering::Relaxed);
        acc.bytes += worker.stats.bytes_recorded.load(Ordering::Relaxed);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::stats::TtlBucket;
    use crate::store::{MemoryStore, Ttl};

    fn processor(store: MemoryStore) -> KeyProcessor<MemoryStore> {
        KeyProcessor::new(
            store,
            Arc::new(TtlAggregator::new(3600)),
            Arc::new(DuplicateIndex::new()),
        )
    }

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::default();
        stats.record_key(10);
        stats.record_key(5);
        stats.record_skip();

        assert_eq!(stats.keys_recorded.load(Ordering::Relaxed), 2);
        assert_eq!(stats.bytes_recorded.load(Ordering::Relaxed), 15);
        assert_eq!(stats.keys_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(stats.keys_seen(), 3);
    }

    #[test]
    fn test_process_records_key() {
        let store = MemoryStore::new();
        store.insert("k", "hello", Ttl::from_secs(30));
        let mut p = processor(store);

        let outcome = p.process(b"k".to_vec());
        assert!(outcome.is_recorded());

        let snap = p.ttl_stats.snapshot();
        assert_eq!(snap.bucket(TtlBucket::Short).count, 1);
        assert_eq!(snap.bucket(TtlBucket::Short).bytes, 5);

        let entry = p.duplicates.get(fingerprint(b"hello")).unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.ttls[&b"k"[..]], Ttl::from_secs(30));
    }

    #[test]
    fn test_process_skips_failed_fetch() {
        let store = MemoryStore::new();
        store.insert_vanished("gone");
        store.insert_wrong_type("hash");
        let mut p = processor(store);

        assert!(!p.process(b"gone".to_vec()).is_recorded());
        assert!(!p.process(b"hash".to_vec()).is_recorded());
        assert!(!p.process(b"never-existed".to_vec()).is_recorded());

        assert_eq!(p.ttl_stats.snapshot().total_keys(), 0);
        assert!(p.duplicates.is_empty());
    }

    #[test]
    fn test_process_empty_value() {
        let store = MemoryStore::new();
        store.insert("empty", "", Ttl::NO_EXPIRY);
        let mut p = processor(store);

        assert!(p.process(b"empty".to_vec()).is_recorded());
        let snap = p.ttl_stats.snapshot();
        assert_eq!(snap.bucket(TtlBucket::NoExpiry).count, 1);
        assert_eq!(snap.bucket(TtlBucket::NoExpiry).bytes, 0);
    }

    #[test]
    fn test_process_skips_failed_ttl_with_readable_value() {
        let store = MemoryStore::new();
        store.insert_ttl_failure("flaky", "shared");
        store.insert("steady", "shared", Ttl::NO_EXPIRY);
        let mut p = processor(store);

        match p.process(b"flaky".to_vec()) {
            KeyOutcome::Skipped { key, error } => {
                assert_eq!(key, b"flaky");
                assert!(matches!(error, StoreError::Command { command: "TTL", .. }));
            }
            other => panic!("expected skip, got {:?}", other),
        }
        assert!(p.process(b"steady".to_vec()).is_recorded());

        let snap = p.ttl_stats.snapshot();
        assert_eq!(snap.total_keys(), 1);
        assert_eq!(snap.bucket(TtlBucket::NoExpiry).bytes, 6);

        let entry = p.duplicates.get(fingerprint(b"shared")).unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.keys, vec![b"steady".to_vec()]);
    }

    #[test]
    fn test_process_binary_key() {
        let key = vec![0xde, 0xad, 0xff];
        let store = MemoryStore::new();
        store.insert(key.clone(), "v", Ttl::from_secs(10));
        let mut p = processor(store);

        assert!(p.process(key.clone()).is_recorded());
        let entry = p.duplicates.get(fingerprint(b"v")).unwrap();
        assert_eq!(entry.freshest_key(), Some(key.as_slice()));
    }
}
