//! TTL histogram
//!
//! Four mutually exclusive buckets, each with a key count and the sum of
//! value sizes. All buckets sit behind a single mutex; the critical section
//! is two additions, so contention stays low even with many workers.

use crate::store::Ttl;
use parking_lot::Mutex;

/// Bucket a key falls into based on its TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlBucket {
    /// TTL == -1
    NoExpiry,
    /// TTL < -1
    Expired,
    /// 0 <= TTL < threshold
    Short,
    /// TTL >= threshold
    Long,
}

impl TtlBucket {
    /// All buckets in report order
    pub const ALL: [TtlBucket; 4] = [
        TtlBucket::NoExpiry,
        TtlBucket::Expired,
        TtlBucket::Short,
        TtlBucket::Long,
    ];

    /// Classify a TTL against the short-TTL threshold (seconds)
    pub fn classify(ttl: Ttl, short_ttl_secs: i64) -> Self {
        if ttl.is_no_expiry() {
            TtlBucket::NoExpiry
        } else if ttl.is_expired() {
            TtlBucket::Expired
        } else if ttl.as_secs() < short_ttl_secs {
            TtlBucket::Short
        } else {
            TtlBucket::Long
        }
    }

    /// Label used in the console summary
    pub fn label(self) -> &'static str {
        match self {
            TtlBucket::NoExpiry => "No Expiry",
            TtlBucket::Expired => "Expired",
            TtlBucket::Short => "Short TTL",
            TtlBucket::Long => "Long TTL",
        }
    }

    fn index(self) -> usize {
        match self {
            TtlBucket::NoExpiry => 0,
            TtlBucket::Expired => 1,
            TtlBucket::Short => 2,
            TtlBucket::Long => 3,
        }
    }
}

/// Count and cumulative size for one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub count: u64,
    pub bytes: u64,
}

/// Point-in-time copy of the histogram
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlSnapshot {
    buckets: [BucketStats; 4],
}

impl TtlSnapshot {
    /// Stats for one bucket
    pub fn bucket(&self, bucket: TtlBucket) -> BucketStats {
        self.buckets[bucket.index()]
    }

    /// Keys across all buckets
    pub fn total_keys(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Bytes across all buckets
    pub fn total_bytes(&self) -> u64 {
        self.buckets.iter().map(|b| b.bytes).sum()
    }

    /// Buckets with their stats, in report order
    pub fn iter(&self) -> impl Iterator<Item = (TtlBucket, BucketStats)> + '_ {
        TtlBucket::ALL.iter().map(move |&b| (b, self.bucket(b)))
    }
}

/// Concurrently updated TTL histogram
#[derive(Debug)]
pub struct TtlAggregator {
    short_ttl_secs: i64,
    buckets: Mutex<[BucketStats; 4]>,
}

impl TtlAggregator {
    /// Create an empty histogram with the given short-TTL threshold
    pub fn new(short_ttl_secs: i64) -> Self {
        Self {
            short_ttl_secs,
            buckets: Mutex::new([BucketStats::default(); 4]),
        }
    }

    /// Short-TTL threshold in seconds
    pub fn short_ttl_secs(&self) -> i64 {
        self.short_ttl_secs
    }

    /// Classify a key and add it to its bucket; returns the bucket used
    pub fn record(&self, ttl: Ttl, size: u64) -> TtlBucket {
        let bucket = TtlBucket::classify(ttl, self.short_ttl_secs);

        let mut buckets = self.buckets.lock();
        let slot = &mut buckets[bucket.index()];
        slot.count += 1;
        slot.bytes += size;

        bucket
    }

    /// Copy the current state out
    pub fn snapshot(&self) -> TtlSnapshot {
        TtlSnapshot {
            buckets: *self.buckets.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_classify_boundaries() {
        let threshold = 3600;
        assert_eq!(TtlBucket::classify(Ttl::NO_EXPIRY, threshold), TtlBucket::NoExpiry);
        assert_eq!(TtlBucket::classify(Ttl::MISSING, threshold), TtlBucket::Expired);
        assert_eq!(TtlBucket::classify(Ttl::from_secs(-5), threshold), TtlBucket::Expired);
        assert_eq!(TtlBucket::classify(Ttl::from_secs(0), threshold), TtlBucket::Short);
        assert_eq!(TtlBucket::classify(Ttl::from_secs(3599), threshold), TtlBucket::Short);
        assert_eq!(TtlBucket::classify(Ttl::from_secs(3600), threshold), TtlBucket::Long);
        assert_eq!(TtlBucket::classify(Ttl::from_secs(86400), threshold), TtlBucket::Long);
    }

    #[test]
    fn test_zero_threshold_has_no_short_bucket() {
        assert_eq!(TtlBucket::classify(Ttl::from_secs(0), 0), TtlBucket::Long);
    }

    #[test]
    fn test_record_updates_one_bucket() {
        let agg = TtlAggregator::new(3600);
        assert_eq!(agg.record(Ttl::from_secs(100), 7), TtlBucket::Short);

        let snap = agg.snapshot();
        assert_eq!(snap.bucket(TtlBucket::Short), BucketStats { count: 1, bytes: 7 });
        assert_eq!(snap.bucket(TtlBucket::Long), BucketStats::default());
        assert_eq!(snap.bucket(TtlBucket::NoExpiry), BucketStats::default());
        assert_eq!(snap.bucket(TtlBucket::Expired), BucketStats::default());
        assert_eq!(snap.total_keys(), 1);
        assert_eq!(snap.total_bytes(), 7);
    }

    #[test]
    fn test_concurrent_records() {
        let agg = Arc::new(TtlAggregator::new(10));
        let handles: Vec<_> = (0..8i64)
            .map(|t| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    for i in 0..1000i64 {
                        let ttl = match (t + i) % 4 {
                            0 => Ttl::NO_EXPIRY,
                            1 => Ttl::MISSING,
                            2 => Ttl::from_secs(5),
                            _ => Ttl::from_secs(50),
                        };
                        agg.record(ttl, 2);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = agg.snapshot();
        assert_eq!(snap.total_keys(), 8000);
        assert_eq!(snap.total_bytes(), 16000);
        for (_, stats) in snap.iter() {
            assert_eq!(stats.count, 2000);
            assert_eq!(stats.bytes, 4000);
        }
    }
}
