//! Key-value store access
//!
//! The scanner only needs four operations from the store: a paginated
//! key enumeration (SCAN), a remaining-TTL query, a raw GET and a PING.
//! They are expressed as the [`KeyStore`] trait so the pipeline can run
//! against a live Redis server or the in-process [`MemoryStore`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  StoreConnector                      │
//! │  - Shared by the coordinator and all workers        │
//! │  - Opens one connection per caller                  │
//! └──────────────────────────┬──────────────────────────┘
//!                            │ connect()
//!                            ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                     KeyStore                         │
//! │  - One per worker thread (owned, not shared)        │
//! │  - SCAN / TTL / GET / PING                          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod memory;
pub mod redis_store;

pub use self::memory::{MemoryConnector, MemoryStore};
pub use self::redis_store::{RedisConnector, RedisStore};

use crate::error::StoreResult;
use std::borrow::Cow;
use std::fmt;

/// Cursor value that both starts and ends a SCAN iteration
pub const SCAN_CURSOR_START: u64 = 0;

/// Printable form of a binary-safe key name
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn display_key(key: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(key)
}

/// Remaining time-to-live of a key, in seconds, as reported by TTL
///
/// Follows the store's convention: `-1` means the key has no expiry, any
/// other negative value means the key no longer exists (or just expired).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ttl(i64);

impl Ttl {
    /// Key exists and has no expiry set
    pub const NO_EXPIRY: Ttl = Ttl(-1);

    /// Key does not exist
    pub const MISSING: Ttl = Ttl(-2);

    /// Wrap a raw TTL reply
    pub const fn from_secs(secs: i64) -> Self {
        Ttl(secs)
    }

    /// Raw TTL reply in seconds
    pub const fn as_secs(self) -> i64 {
        self.0
    }

    /// True when the key has no expiry
    pub const fn is_no_expiry(self) -> bool {
        self.0 == -1
    }

    /// True when the store reported the key as gone/expired
    pub const fn is_expired(self) -> bool {
        self.0 < -1
    }

    /// Ordering rank for "freshest key" selection
    ///
    /// A key without expiry outlives any finite TTL, so it ranks highest.
    pub const fn freshness(self) -> i64 {
        if self.is_no_expiry() {
            i64::MAX
        } else {
            self.0
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            -1 => write!(f, "no-expiry"),
            s if s < -1 => write!(f, "expired"),
            s => write!(f, "{}s", s),
        }
    }
}

/// One page of a SCAN iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Raw key names returned by this call (may be empty)
    pub keys: Vec<Vec<u8>>,

    /// Cursor for the next call; [`SCAN_CURSOR_START`] when done
    pub next_cursor: u64,
}

/// Operations on a single store connection
pub trait KeyStore {
    /// Fetch one page of keys matching `pattern` starting at `cursor`
    fn scan_page(&mut self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage>;

    /// Remaining TTL of `key`
    fn ttl(&mut self, key: &[u8]) -> StoreResult<Ttl>;

    /// Raw value bytes of `key`
    ///
    /// Returns [`StoreError::KeyMissing`](crate::error::StoreError::KeyMissing)
    /// if the key no longer exists.
    fn get(&mut self, key: &[u8]) -> StoreResult<Vec<u8>>;

    /// Verify the connection is usable
    fn ping(&mut self) -> StoreResult<()>;
}

/// Factory for per-thread store connections
pub trait StoreConnector: Send + Sync {
    /// Connection type handed to each worker
    type Conn: KeyStore + Send + 'static;

    /// Open a new connection
    fn connect(&self) -> StoreResult<Self::Conn>;

    /// Human-readable target, for logs and status lines
    fn describe(&self) -> String;
}
