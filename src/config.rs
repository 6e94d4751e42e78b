//! Configuration types for redis-inventory
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Store address parsing

use crate::error::ConfigError;
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Default Redis port
pub const DEFAULT_PORT: u16 = 6379;

/// Regex for `host:port` and `[v6]:port` addresses (scheme already stripped)
static ADDR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[([0-9A-Fa-f:.]+)\]|([^:\[\]/\s]+))(?::(\d+))?/?$")
        .expect("Invalid address regex")
});

/// Inventory a Redis keyspace: TTL buckets and duplicate values
#[derive(Parser, Debug, Clone)]
#[command(
    name = "redis-inventory",
    version,
    about = "Redis analyzer for TTLs and duplicate values",
    long_about = "Scans a Redis keyspace with SCAN, fetches TTL and value for every matching key \
                  in parallel, and reports keys per TTL bucket plus groups of keys holding \
                  byte-identical values.",
    after_help = "EXAMPLES:\n    \
        redis-inventory --addr localhost:6379\n    \
        redis-inventory --addr cache.internal:6380 --tls --match 'session:*' -w 16\n    \
        redis-inventory --db 2 --short-ttl 600 --export dups.csv"
)]
pub struct CliArgs {
    /// Redis server address (host:port)
    #[arg(long, default_value = "localhost:6379", value_name = "ADDR")]
    pub addr: String,

    /// ACL username (Redis 6+)
    #[arg(long, value_name = "USER")]
    pub username: Option<String>,

    /// Redis password
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Redis database index
    #[arg(long, default_value_t = 0, value_name = "NUM")]
    pub db: i64,

    /// Enable TLS connection to Redis (certificate verification disabled)
    #[arg(long)]
    pub tls: bool,

    /// Key pattern to match
    #[arg(long = "match", default_value = "*", value_name = "PATTERN")]
    pub pattern: String,

    /// Number of worker threads
    #[arg(short = 'w', long, default_value_t = 5, value_name = "NUM")]
    pub workers: usize,

    /// Threshold (in seconds) for short TTL
    #[arg(long, default_value_t = 3600, value_name = "SECS")]
    pub short_ttl: u64,

    /// Path to CSV file for export (optional)
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Key queue capacity between the scanner and the workers
    #[arg(long, default_value_t = 1000, value_name = "NUM")]
    pub queue_size: usize,

    /// SCAN COUNT hint (keys per page)
    #[arg(long, default_value_t = 500, value_name = "NUM")]
    pub scan_count: usize,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Parsed store address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAddr {
    /// Hostname or IP
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Set when the address used the `rediss://` scheme
    pub tls: bool,
}

impl StoreAddr {
    /// Parse a store address
    ///
    /// Accepts formats:
    /// - host
    /// - host:port
    /// - [::1]:port
    /// - redis://host:port, rediss://host:port
    pub fn parse(addr: &str) -> Result<Self, ConfigError> {
        let trimmed = addr.trim();

        let (rest, tls) = if let Some(rest) = trimmed.strip_prefix("rediss://") {
            (rest, true)
        } else if let Some(rest) = trimmed.strip_prefix("redis://") {
            (rest, false)
        } else {
            (trimmed, false)
        };

        let invalid = |reason: &str| ConfigError::InvalidAddress {
            addr: addr.to_string(),
            reason: reason.to_string(),
        };

        let caps = ADDR_REGEX
            .captures(rest)
            .ok_or_else(|| invalid("expected host:port"))?;

        let host = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| invalid("missing host"))?;

        let port = match caps.get(3) {
            Some(m) => m
                .as_str()
                .parse::<u16>()
                .map_err(|_| invalid("port out of range"))?,
            None => DEFAULT_PORT,
        };

        if port == 0 {
            return Err(invalid("port must be non-zero"));
        }

        Ok(Self { host, port, tls })
    }

    /// Format as host:port for display and logging
    pub fn to_display_string(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Store address
    pub addr: StoreAddr,

    /// ACL username
    pub username: Option<String>,

    /// Password
    pub password: Option<String>,

    /// Database index
    pub db: i64,

    /// Use TLS
    pub tls: bool,

    /// SCAN MATCH pattern
    pub pattern: String,

    /// Number of worker threads
    pub worker_count: usize,

    /// Keys with a TTL below this many seconds land in the short bucket
    pub short_ttl_secs: i64,

    /// Optional CSV export path
    pub export_path: Option<PathBuf>,

    /// Key queue capacity
    pub queue_size: usize,

    /// SCAN COUNT hint
    pub scan_count: usize,

    /// Show progress indicator
    pub show_progress: bool,
}

impl ScanConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let addr = StoreAddr::parse(&args.addr)?;

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize {
                size: args.queue_size,
                min: MIN_QUEUE_SIZE,
            });
        }

        if args.scan_count == 0 {
            return Err(ConfigError::InvalidScanCount {
                count: args.scan_count,
            });
        }

        // Fail before the scan rather than after it
        if let Some(ref path) = args.export {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidExportPath {
                        path: path.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        let tls = args.tls || addr.tls;

        Ok(Self {
            addr,
            username: args.username,
            password: args.password.filter(|p| !p.is_empty()),
            db: args.db,
            tls,
            pattern: args.pattern,
            worker_count: args.workers,
            short_ttl_secs: i64::try_from(args.short_ttl).unwrap_or(i64::MAX),
            export_path: args.export,
            queue_size: args.queue_size,
            scan_count: args.scan_count,
            show_progress: !args.quiet,
        })
    }

    /// Configuration for a local store with default settings
    pub fn local() -> Self {
        Self {
            addr: StoreAddr {
                host: "localhost".into(),
                port: DEFAULT_PORT,
                tls: false,
            },
            username: None,
            password: None,
            db: 0,
            tls: false,
            pattern: "*".into(),
            worker_count: 5,
            short_ttl_secs: 3600,
            export_path: None,
            queue_size: 1000,
            scan_count: 500,
            show_progress: false,
        }
    }
}
