//! Parallel keyspace scanner
//!
//! One producer walks the keyspace with SCAN and feeds key names into a
//! bounded queue. N workers, each with its own connection, fetch TTL and
//! value for every key and record it into the shared aggregators.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │     ScanCoordinator     │
//!                     │  - KeyStream (SCAN)     │
//!                     └───────────┬─────────────┘
//!                                 │ key names
//!                     ┌───────────▼─────────────┐
//!                     │  KeyQueue (bounded)     │
//!                     └───────────┬─────────────┘
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │  TTL+GET  │             │  TTL+GET  │             │  TTL+GET  │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                 TtlAggregator + DuplicateIndex
//! ```

pub mod coordinator;
pub mod key_stream;
pub mod queue;
pub mod worker;

pub use coordinator::{ScanCoordinator, ScanProgress, ScanResult};
pub use key_stream::KeyStream;
pub use queue::{KeyQueue, KeyQueueReceiver, KeyQueueSender, QueueStats};
pub use worker::{aggregate_stats, KeyProcessor, Worker, WorkerStats, WorkerTotals};
