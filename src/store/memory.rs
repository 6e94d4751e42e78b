//! In-process store
//!
//! A small keyspace held in memory that speaks the same cursor protocol as
//! Redis SCAN. Used by the test suite and the benchmarks, and handy for
//! dry runs of the pipeline without a server.

use crate::error::{StoreError, StoreResult};
use crate::store::{display_key, KeyStore, ScanPage, StoreConnector, Ttl, SCAN_CURSOR_START};

use parking_lot::RwLock;
use regex::bytes::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What a key holds in the memory store
#[derive(Debug, Clone)]
enum Slot {
    /// String value with a TTL
    Value { bytes: Vec<u8>, ttl: Ttl },

    /// Non-string type: GET fails with WRONGTYPE
    WrongType,

    /// String value whose TTL query fails
    TtlFailure { bytes: Vec<u8> },

    /// Listed by SCAN but gone by the time it is fetched
    Vanished,
}

#[derive(Debug, Default)]
struct Inner {
    slots: BTreeMap<Vec<u8>, Slot>,

    /// SCAN calls fail once this many pages have been served
    fail_scan_after: Option<u64>,

    /// connect() fails when set
    refuse_connections: bool,
}

/// Shared in-memory keyspace; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    pages_served: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a string value with the given TTL
    pub fn insert(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, ttl: Ttl) {
        self.inner.write().slots.insert(
            key.into(),
            Slot::Value {
                bytes: value.into(),
                ttl,
            },
        );
    }

    /// Add a key holding a non-string type
    pub fn insert_wrong_type(&self, key: impl Into<Vec<u8>>) {
        self.inner.write().slots.insert(key.into(), Slot::WrongType);
    }

    /// Add a key that SCAN reports but that no longer exists on fetch
    pub fn insert_vanished(&self, key: impl Into<Vec<u8>>) {
        self.inner.write().slots.insert(key.into(), Slot::Vanished);
    }

    /// Add a readable key whose TTL query errors
    pub fn insert_ttl_failure(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.inner.write().slots.insert(
            key.into(),
            Slot::TtlFailure {
                bytes: value.into(),
            },
        );
    }

    /// Make SCAN fail after `pages` successful pages
    pub fn fail_scan_after(&self, pages: u64) {
        self.inner.write().fail_scan_after = Some(pages);
    }

    /// Make every subsequent connect() fail
    pub fn refuse_connections(&self) {
        self.inner.write().refuse_connections = true;
    }

    /// Number of keys in the store
    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    /// True if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.inner.read().slots.is_empty()
    }

    /// Number of SCAN pages served so far
    pub fn pages_served(&self) -> u64 {
        self.pages_served.load(Ordering::Relaxed)
    }
}

impl KeyStore for MemoryStore {
    fn scan_page(&mut self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let inner = self.inner.read();

        let served = self.pages_served.load(Ordering::Relaxed);
        if inner.fail_scan_after.is_some_and(|limit| served >= limit) {
            return Err(StoreError::ScanFailed {
                cursor,
                reason: "injected failure".into(),
            });
        }

        let matcher = glob_to_regex(pattern).map_err(|reason| StoreError::ScanFailed {
            cursor,
            reason,
        })?;

        // The cursor is a position in key order; COUNT is how many slots
        // to examine, not how many matches to return.
        let start = cursor as usize;
        let step = count.max(1);
        let keys = inner
            .slots
            .keys()
            .skip(start)
            .take(step)
            .filter(|k| matcher.is_match(k.as_slice()))
            .cloned()
            .collect();

        let end = start + step;
        let next_cursor = if end >= inner.slots.len() {
            SCAN_CURSOR_START
        } else {
            end as u64
        };

        self.pages_served.fetch_add(1, Ordering::Relaxed);
        Ok(ScanPage { keys, next_cursor })
    }

    fn ttl(&mut self, key: &[u8]) -> StoreResult<Ttl> {
        match self.inner.read().slots.get(key) {
            Some(Slot::Value { ttl, .. }) => Ok(*ttl),
            Some(Slot::TtlFailure { .. }) => Err(StoreError::Command {
                command: "TTL",
                key: display_key(key).into_owned(),
                reason: "injected failure".into(),
            }),
            Some(Slot::WrongType) => Ok(Ttl::NO_EXPIRY),
            Some(Slot::Vanished) | None => Ok(Ttl::MISSING),
        }
    }

    fn get(&mut self, key: &[u8]) -> StoreResult<Vec<u8>> {
        match self.inner.read().slots.get(key) {
            Some(Slot::Value { bytes, .. }) | Some(Slot::TtlFailure { bytes }) => Ok(bytes.clone()),
            Some(Slot::WrongType) => Err(StoreError::Command {
                command: "GET",
                key: display_key(key).into_owned(),
                reason: "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
            }),
            Some(Slot::Vanished) | None => Err(StoreError::KeyMissing {
                key: display_key(key).into_owned(),
            }),
        }
    }

    fn ping(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Connector handing out clones of one [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

impl StoreConnector for MemoryConnector {
    type Conn = MemoryStore;

    fn connect(&self) -> StoreResult<MemoryStore> {
        if self.store.inner.read().refuse_connections {
            return Err(StoreError::ConnectionFailed {
                addr: "memory".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(self.store.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory store ({} keys)", self.store.len())
    }
}

/// Translate a Redis glob (`*`, `?`, `[...]`, `\x`) into an anchored regex
///
/// Matching is byte-wise, like Redis, so `?` matches any single byte.
fn glob_to_regex(pattern: &str) -> Result<Regex, String> {
    let mut re = String::with_capacity(pattern.len() * 2 + 8);
    re.push_str("(?s-u)^");

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => push_literal(&mut re, escaped),
                None => re.push_str(r"\\"),
            },
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    re.push('^');
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' | '[' | '&' | '~' => {
                            re.push('\\');
                            re.push(inner);
                        }
                        other if other.is_ascii() => re.push(other),
                        other => push_byte_escapes(&mut re, other),
                    }
                }
                if !closed {
                    return Err(format!("unterminated character class in '{}'", pattern));
                }
                re.push(']');
            }
            other => push_literal(&mut re, other),
        }
    }

    re.push('$');
    Regex::new(&re).map_err(|e| e.to_string())
}

/// Append `c` as a literal; non-ASCII characters become UTF-8 byte escapes
fn push_literal(re: &mut String, c: char) {
    if c.is_ascii() {
        re.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4])));
    } else {
        push_byte_escapes(re, c);
    }
}

fn push_byte_escapes(re: &mut String, c: char) {
    for byte in c.encode_utf8(&mut [0u8; 4]).bytes() {
        re.push_str(&format!("\\x{:02X}", byte));
    }
}
