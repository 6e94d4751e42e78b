//! Content fingerprinting for duplicate detection

pub mod checksum;

pub use checksum::{fingerprint, Fingerprint};
