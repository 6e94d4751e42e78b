//! Integration tests for redis-inventory
//!
//! The full pipeline runs against the in-memory store; no Redis server is
//! needed.

use clap::Parser;
use redis_inventory::config::{CliArgs, ScanConfig};
use redis_inventory::content::fingerprint;
use redis_inventory::error::{AnalyzerError, StoreError};
use redis_inventory::report::{duplicate_lines, export_duplicates, ttl_summary_lines};
use redis_inventory::scanner::ScanCoordinator;
use redis_inventory::stats::TtlBucket;
use redis_inventory::store::{MemoryConnector, MemoryStore, Ttl};
use tempfile::tempdir;

fn scan(store: &MemoryStore, config: ScanConfig) -> redis_inventory::Result<redis_inventory::ScanResult> {
    let coordinator = ScanCoordinator::connect(config, MemoryConnector::new(store.clone()))?;
    coordinator.run(None)
}

fn small_config(workers: usize, queue_size: usize, scan_count: usize) -> ScanConfig {
    ScanConfig {
        worker_count: workers,
        queue_size,
        scan_count,
        ..ScanConfig::local()
    }
}

#[test]
fn test_three_key_scenario() {
    let store = MemoryStore::new();
    store.insert("k1", "x", Ttl::from_secs(100));
    store.insert("k2", "x", Ttl::NO_EXPIRY);
    store.insert("k3", "y", Ttl::from_secs(-2));

    let result = scan(&store, ScanConfig::local()).unwrap();

    assert_eq!(result.keys_scanned, 3);
    assert_eq!(result.keys_recorded, 3);
    assert_eq!(result.keys_skipped, 0);

    let ttl = result.ttl;
    assert_eq!(ttl.bucket(TtlBucket::Short).count, 1);
    assert_eq!(ttl.bucket(TtlBucket::Short).bytes, 1);
    assert_eq!(ttl.bucket(TtlBucket::NoExpiry).count, 1);
    assert_eq!(ttl.bucket(TtlBucket::NoExpiry).bytes, 1);
    assert_eq!(ttl.bucket(TtlBucket::Expired).count, 1);
    assert_eq!(ttl.bucket(TtlBucket::Expired).bytes, 1);
    assert_eq!(ttl.bucket(TtlBucket::Long).count, 0);

    let x = result.duplicates.get(fingerprint(b"x")).unwrap();
    assert_eq!(x.count, 2);
    assert_eq!(x.size, 2);
    assert_eq!(x.freshest_key(), Some(&b"k2"[..]));

    let groups = result.duplicates.duplicate_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].sample, "k2");

    assert_eq!(
        duplicate_lines(&result.duplicates),
        vec!["Count: 2, Size: 0.00 KB, Sample: k2"]
    );
    assert_eq!(ttl_summary_lines(&ttl).last().unwrap(), "Total Size: 0.00 MB");
}

#[test]
fn test_three_key_scenario_export() {
    let store = MemoryStore::new();
    store.insert("k1", "x", Ttl::from_secs(100));
    store.insert("k2", "x", Ttl::NO_EXPIRY);
    store.insert("k3", "y", Ttl::from_secs(-2));

    let result = scan(&store, ScanConfig::local()).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("dups.csv");
    let rows = export_duplicates(&path, &result.duplicates).unwrap();

    assert_eq!(rows, 1);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "count,size_kb,sample\n2,0.00,k2\n"
    );
}

#[test]
fn test_failed_fetches_are_skipped() {
    let store = MemoryStore::new();
    for i in 0..20 {
        store.insert(format!("live:{:02}", i), "payload", Ttl::from_secs(7200));
    }
    store.insert_vanished("gone:1");
    store.insert_vanished("gone:2");
    store.insert_wrong_type("hash:1");
    store.insert_ttl_failure("flaky:1", "payload");

    let result = scan(&store, small_config(3, 4, 5)).unwrap();

    assert_eq!(result.keys_scanned, 24);
    assert_eq!(result.keys_recorded, 20);
    assert_eq!(result.keys_skipped, 4);
    assert_eq!(result.ttl.total_keys(), result.keys_recorded);
    assert_eq!(result.ttl.bucket(TtlBucket::Long).count, 20);

    // Skipped keys never reach the duplicate index, even when GET succeeds
    let payload = result.duplicates.get(fingerprint(b"payload")).unwrap();
    assert_eq!(payload.count, 20);
    assert!(!payload.ttls.contains_key(&b"flaky:1"[..]));
    assert_eq!(result.duplicates.len(), 1);
}

#[test]
fn test_many_keys_many_workers() {
    let store = MemoryStore::new();
    for i in 0..5000u64 {
        let value = format!("value-{}", i % 50);
        let ttl = match i % 4 {
            0 => Ttl::NO_EXPIRY,
            1 => Ttl::from_secs(-2),
            2 => Ttl::from_secs(60),
            _ => Ttl::from_secs(86_400),
        };
        store.insert(format!("key:{:05}", i), value, ttl);
    }

    let result = scan(&store, small_config(16, 2, 37)).unwrap();

    assert_eq!(result.keys_scanned, 5000);
    assert_eq!(result.keys_recorded, 5000);
    for bucket in TtlBucket::ALL {
        assert_eq!(result.ttl.bucket(bucket).count, 1250);
    }

    // 50 distinct values, each stored by 100 keys
    assert_eq!(result.duplicates.len(), 50);
    let groups = result.duplicates.duplicate_groups();
    assert_eq!(groups.len(), 50);
    assert!(groups.iter().all(|g| g.count == 100));

    let single = format!("value-{}", 7).len() as u64;
    let entry = result.duplicates.get(fingerprint(b"value-7")).unwrap();
    assert_eq!(entry.size, 100 * single);
    assert_eq!(result.total_bytes, result.ttl.total_bytes());
}

#[test]
fn test_binary_key_names_are_inventoried() {
    let store = MemoryStore::new();
    let binary = vec![b'b', b'l', b'o', b'b', b':', 0xff, 0xfe];
    store.insert(binary.clone(), "same", Ttl::NO_EXPIRY);
    store.insert("blob:text", "same", Ttl::from_secs(30));
    store.insert("blob:other", "different", Ttl::from_secs(30));

    let config = ScanConfig {
        pattern: "blob:*".into(),
        ..small_config(2, 2, 1)
    };
    let result = scan(&store, config).unwrap();

    assert_eq!(result.keys_scanned, 3);
    assert_eq!(result.keys_recorded, 3);
    assert_eq!(result.keys_skipped, 0);
    assert_eq!(result.ttl.bucket(TtlBucket::NoExpiry).count, 1);

    let entry = result.duplicates.get(fingerprint(b"same")).unwrap();
    assert_eq!(entry.count, 2);
    assert_eq!(entry.freshest_key(), Some(binary.as_slice()));

    let dir = tempdir().unwrap();
    let path = dir.path().join("binary.csv");
    assert_eq!(export_duplicates(&path, &result.duplicates).unwrap(), 1);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "count,size_kb,sample\n2,0.01,blob:\u{fffd}\u{fffd}\n"
    );
}

#[test]
fn test_match_pattern_limits_scan() {
    let store = MemoryStore::new();
    store.insert("session:a", "s", Ttl::from_secs(10));
    store.insert("session:b", "s", Ttl::from_secs(20));
    store.insert("user:a", "u", Ttl::NO_EXPIRY);

    let config = ScanConfig {
        pattern: "session:*".into(),
        ..small_config(2, 10, 1)
    };
    let result = scan(&store, config).unwrap();

    assert_eq!(result.keys_scanned, 2);
    assert_eq!(result.ttl.bucket(TtlBucket::Short).count, 2);
    assert_eq!(result.ttl.bucket(TtlBucket::NoExpiry).count, 0);
}

#[test]
fn test_scan_failure_is_fatal() {
    let store = MemoryStore::new();
    for i in 0..100 {
        store.insert(format!("k{}", i), "v", Ttl::NO_EXPIRY);
    }
    store.fail_scan_after(3);

    let err = scan(&store, small_config(4, 8, 10)).unwrap_err();
    assert!(matches!(
        err,
        AnalyzerError::Store(StoreError::ScanFailed { .. })
    ));
}

#[test]
fn test_connection_refused_is_fatal() {
    let store = MemoryStore::new();
    store.insert("k", "v", Ttl::NO_EXPIRY);
    store.refuse_connections();

    let result = ScanCoordinator::connect(ScanConfig::local(), MemoryConnector::new(store));
    assert!(matches!(
        result,
        Err(AnalyzerError::Store(StoreError::ConnectionFailed { .. }))
    ));
}

#[test]
fn test_empty_keyspace() {
    let store = MemoryStore::new();
    let result = scan(&store, ScanConfig::local()).unwrap();

    assert_eq!(result.keys_scanned, 0);
    assert_eq!(result.ttl.total_keys(), 0);
    assert!(result.duplicates.is_empty());
    assert_eq!(result.pages, 1);
}

#[test]
fn test_export_sorted_by_size() {
    let store = MemoryStore::new();
    for (i, size) in [10usize, 3000, 700, 12_500, 50].iter().enumerate() {
        let value = vec![b'a' + i as u8; *size];
        store.insert(format!("a:{}", i), value.clone(), Ttl::from_secs(5));
        store.insert(format!("b:{}", i), value, Ttl::from_secs(500));
    }
    store.insert("unique", "only once", Ttl::NO_EXPIRY);

    let result = scan(&store, small_config(4, 3, 2)).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("out.csv");
    assert_eq!(export_duplicates(&path, &result.duplicates).unwrap(), 5);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["count", "size_kb", "sample"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 5);

    let sizes: Vec<f64> = rows.iter().map(|r| r[1].parse().unwrap()).collect();
    assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(&rows[0][0], "2");
    assert_eq!(&rows[0][1], "24.41");
    // Longer TTL wins the sample
    assert!(rows.iter().all(|r| r[2].starts_with("b:")));
}

#[test]
fn test_cli_to_config() {
    let args = CliArgs::try_parse_from([
        "redis-inventory",
        "--addr",
        "rediss://cache.internal:6380",
        "--match",
        "user:*",
        "-w",
        "8",
        "--short-ttl",
        "600",
    ])
    .unwrap();

    let config = ScanConfig::from_args(args).unwrap();
    assert_eq!(config.addr.host, "cache.internal");
    assert_eq!(config.addr.port, 6380);
    assert!(config.tls);
    assert_eq!(config.pattern, "user:*");
    assert_eq!(config.worker_count, 8);
    assert_eq!(config.short_ttl_secs, 600);
}
