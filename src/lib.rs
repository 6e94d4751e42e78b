//! redis-inventory - Keyspace TTL and duplicate-value inventory for Redis
//!
//! Walks a Redis keyspace with SCAN, fetches the TTL and value of every
//! key with a pool of worker threads, and reports how the keyspace is
//! spread over TTL classes and which values are stored more than once.
//!
//! # Features
//!
//! - **Non-blocking Enumeration**: Cursor-based SCAN, never KEYS, so the
//!   server keeps serving traffic during the inventory.
//!
//! - **Parallel Fetching**: Multiple worker threads each with their own
//!   connection issue TTL and GET per key.
//!
//! - **Memory Efficient**: Bounded key queue with backpressure; only one
//!   SCAN page and the queue contents are held at a time.
//!
//! - **Duplicate Detection**: Values are grouped by a 64-bit xxHash
//!   fingerprint; the freshest key of each group is reported as its sample.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Redis Server                              │
//! └──────────────┬──────────────────────────────────┬───────────────┘
//!                │ SCAN                             │ TTL + GET
//!                ▼                                  │
//! ┌──────────────────────────┐                      │
//! │   KeyStream (producer)   │                      │
//! └────────────┬─────────────┘                      │
//!              ▼                                    │
//! ┌──────────────────────────┐                      │
//! │   Key Queue              │                      │
//! │  (crossbeam bounded)     │                      │
//! └────────────┬─────────────┘                      │
//!              ▼                                    │
//! ┌─────────────────────────────────────────────────┴───────────────┐
//! │                      Worker Threads                              │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐     │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │     │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘     │
//! └───────┼────────────┼────────────┼────────────────────┼──────────┘
//!         └────────────┴─────┬──────┴────────────────────┘
//!                ┌───────────┴────────────┐
//!                ▼                        ▼
//!       ┌─────────────────┐     ┌───────────────────┐
//!       │  TtlAggregator  │     │  DuplicateIndex   │
//!       │  (one mutex)    │     │  (DashMap + entry │
//!       │                 │     │   mutexes)        │
//!       └────────┬────────┘     └─────────┬─────────┘
//!                └───────────┬────────────┘
//!                            ▼
//!                   Console report / CSV
//! ```
//!
//! # Example
//!
//! ```bash
//! # Inventory the whole keyspace
//! redis-inventory --addr localhost:6379
//!
//! # Only session keys, 16 workers, export duplicates
//! redis-inventory --addr redis.internal:6379 --match 'session:*' -w 16 --export dups.csv
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod stats;
pub mod store;

pub use config::{CliArgs, ScanConfig, StoreAddr};
pub use error::{AnalyzerError, Result};
pub use scanner::{ScanCoordinator, ScanResult};
pub use store::{KeyStore, MemoryConnector, MemoryStore, RedisConnector, StoreConnector, Ttl};
