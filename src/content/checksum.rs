//! Value fingerprints using xxHash64
//!
//! xxHash64 is a fast non-cryptographic hash. Two values with the same
//! fingerprint are treated as byte-identical; the collision probability at
//! 64 bits is negligible for an inventory report and this is not a
//! security boundary.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Seed used for every fingerprint so results are stable across runs
const FINGERPRINT_SEED: u64 = 0;

/// 64-bit content fingerprint of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compute the fingerprint of the given value bytes
///
/// # Example
///
/// ```
/// use redis_inventory::content::fingerprint;
///
/// let a = fingerprint(b"payload");
/// let b = fingerprint(b"payload");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string().len(), 16);
/// ```
pub fn fingerprint(content: &[u8]) -> Fingerprint {
    Fingerprint(xxh64(content, FINGERPRINT_SEED))
}
