//! Duplicate value index
//!
//! Maps a content fingerprint to every key holding that content. The map
//! itself is a `DashMap`, so inserts for unrelated fingerprints land on
//! different shards; each entry carries its own mutex so that only updates
//! to the same fingerprint serialize.
//!
//! ```text
//!   DashMap<Fingerprint, Arc<Mutex<DupEntry>>>
//!     │
//!     ├── 0x9a3f.. ─▶ { count: 3, size: 1536, keys: [a, b, c], ttls }
//!     ├── 0x11c0.. ─▶ { count: 1, size: 40,   keys: [d],       ttls }
//!     └── ...
//! ```

use crate::content::Fingerprint;
use crate::store::{display_key, Ttl};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Keys sharing one fingerprint
#[derive(Debug, Default, Clone)]
pub struct DupEntry {
    /// Number of keys recorded with this content
    pub count: u64,

    /// Sum of value sizes across those keys
    pub size: u64,

    /// Raw key names in the order they were recorded
    pub keys: Vec<Vec<u8>>,

    /// TTL of each key at fetch time
    pub ttls: HashMap<Vec<u8>, Ttl>,
}

impl DupEntry {
    /// Key with the longest remaining lifetime, see [`freshest_key`]
    pub fn freshest_key(&self) -> Option<&[u8]> {
        freshest_key(&self.ttls)
    }
}

/// Pick the key that will live longest
///
/// A key with no expiry beats any finite TTL. Among keys with the same TTL
/// the bytewise smallest name wins, so reports are reproducible.
pub fn freshest_key(ttls: &HashMap<Vec<u8>, Ttl>) -> Option<&[u8]> {
    ttls.iter()
        .max_by(|(key_a, ttl_a), (key_b, ttl_b)| {
            ttl_a
                .freshness()
                .cmp(&ttl_b.freshness())
                .then_with(|| key_b.cmp(key_a))
        })
        .map(|(key, _)| key.as_slice())
}

/// Read-only view of one entry, used for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct DupGroup {
    pub fingerprint: Fingerprint,
    pub count: u64,
    pub size: u64,
    /// Freshest key of the group, decoded for display
    pub sample: String,
}

impl DupGroup {
    /// Total size in KiB
    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }

    /// True when more than one key shares the content
    pub fn is_duplicate(&self) -> bool {
        self.count > 1
    }
}

/// Totals over the duplicate groups only (count > 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateSummary {
    /// Fingerprints shared by more than one key
    pub groups: u64,

    /// Keys that belong to such groups
    pub keys: u64,

    /// Bytes held by such keys
    pub bytes: u64,

    /// Bytes that would remain if each group kept a single copy
    pub redundant_bytes: u64,
}

/// Concurrently updated fingerprint -> keys index
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    entries: DashMap<Fingerprint, Arc<Mutex<DupEntry>>>,
}

impl DuplicateIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one key to the entry for `fingerprint`, creating it if needed
    ///
    /// The insert-if-absent step runs under the shard lock, so racing
    /// first insertions of the same fingerprint still yield one entry.
    /// The shard lock is released before the entry lock is taken.
    pub fn record(&self, fingerprint: Fingerprint, key: impl AsRef<[u8]>, ttl: Ttl, size: u64) {
        let key = key.as_ref();
        let entry = Arc::clone(
            self.entries
                .entry(fingerprint)
                .or_insert_with(|| Arc::new(Mutex::new(DupEntry::default())))
                .value(),
        );

        let mut entry = entry.lock();
        entry.count += 1;
        entry.size += size;
        entry.keys.push(key.to_vec());
        entry.ttls.insert(key.to_vec(), ttl);
    }

    /// Number of distinct fingerprints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the entry for `fingerprint`
    pub fn get(&self, fingerprint: Fingerprint) -> Option<DupEntry> {
        self.entries
            .get(&fingerprint)
            .map(|entry| entry.value().lock().clone())
    }

    /// Every group, singletons included, in map iteration order
    pub fn groups(&self) -> Vec<DupGroup> {
        self.entries
            .iter()
            .map(|item| {
                let entry = item.value().lock();
                DupGroup {
                    fingerprint: *item.key(),
                    count: entry.count,
                    size: entry.size,
                    sample: entry
                        .freshest_key()
                        .map(|key| display_key(key).into_owned())
                        .unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Groups with more than one key, in map iteration order
    pub fn duplicate_groups(&self) -> Vec<DupGroup> {
        self.groups()
            .into_iter()
            .filter(DupGroup::is_duplicate)
            .collect()
    }

    /// Aggregate figures over the duplicate groups
    pub fn summary(&self) -> DuplicateSummary {
        self.duplicate_groups()
            .iter()
            .fold(DuplicateSummary::default(), |mut acc, group| {
                acc.groups += 1;
                acc.keys += group.count;
                acc.bytes += group.size;
                acc.redundant_bytes += group.size - group.size / group.count;
                acc
            })
    }
}
