//! Shared aggregation state
//!
//! Both aggregators are created once per run, wrapped in `Arc` and handed
//! to every worker. They are only read after all workers have been joined.

pub mod duplicates;
pub mod ttl;

pub use duplicates::{freshest_key, DupEntry, DupGroup, DuplicateIndex, DuplicateSummary};
pub use ttl::{BucketStats, TtlAggregator, TtlBucket, TtlSnapshot};
