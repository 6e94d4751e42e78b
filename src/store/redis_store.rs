//! Redis-backed store implementation
//!
//! Uses the synchronous `redis` client. Each worker thread opens its own
//! [`RedisStore`] through the shared [`RedisConnector`], so no locking is
//! needed around connections.

use crate::config::ScanConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{display_key, KeyStore, ScanPage, StoreConnector, Ttl};

use redis::{
    Client, Connection, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError,
    RedisResult, Value,
};
use tracing::trace;

/// Opens connections to one Redis server
#[derive(Debug, Clone)]
pub struct RedisConnector {
    client: Client,
    addr: String,
    db: i64,
}

impl RedisConnector {
    /// Build a connector from the validated configuration
    ///
    /// No network traffic happens here; the first [`connect`](StoreConnector::connect)
    /// opens the socket.
    pub fn new(config: &ScanConfig) -> StoreResult<Self> {
        let addr = config.addr.to_display_string();

        let info = ConnectionInfo {
            addr: if config.tls {
                ConnectionAddr::TcpTls {
                    host: config.addr.host.clone(),
                    port: config.addr.port,
                    insecure: true,
                    tls_params: None,
                }
            } else {
                ConnectionAddr::Tcp(config.addr.host.clone(), config.addr.port)
            },
            redis: RedisConnectionInfo {
                db: config.db,
                username: config.username.clone(),
                password: config.password.clone(),
                ..Default::default()
            },
        };

        let client = Client::open(info).map_err(|e| StoreError::ConnectionFailed {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            addr,
            db: config.db,
        })
    }
}

impl StoreConnector for RedisConnector {
    type Conn = RedisStore;

    fn connect(&self) -> StoreResult<RedisStore> {
        let conn = self
            .client
            .get_connection()
            .map_err(|e| StoreError::ConnectionFailed {
                addr: self.addr.clone(),
                reason: e.to_string(),
            })?;

        Ok(RedisStore {
            conn,
            addr: self.addr.clone(),
        })
    }

    fn describe(&self) -> String {
        format!("Redis at {} (db {})", self.addr, self.db)
    }
}

/// A single Redis connection
pub struct RedisStore {
    conn: Connection,
    addr: String,
}

impl KeyStore for RedisStore {
    fn scan_page(&mut self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let scan_err = |e: RedisError| StoreError::ScanFailed {
            cursor,
            reason: e.to_string(),
        };

        let reply: Value = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query(&mut self.conn)
            .map_err(scan_err)?;

        let page = parse_scan_reply(&reply).map_err(scan_err)?;

        trace!(cursor, next = page.next_cursor, keys = page.keys.len(), "SCAN page");
        Ok(page)
    }

    fn ttl(&mut self, key: &[u8]) -> StoreResult<Ttl> {
        let secs: i64 = redis::cmd("TTL")
            .arg(key)
            .query(&mut self.conn)
            .map_err(|e| StoreError::Command {
                command: "TTL",
                key: display_key(key).into_owned(),
                reason: e.to_string(),
            })?;

        Ok(Ttl::from_secs(secs))
    }

    fn get(&mut self, key: &[u8]) -> StoreResult<Vec<u8>> {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query(&mut self.conn)
            .map_err(|e| StoreError::Command {
                command: "GET",
                key: display_key(key).into_owned(),
                reason: e.to_string(),
            })?;

        value.ok_or_else(|| StoreError::KeyMissing {
            key: display_key(key).into_owned(),
        })
    }

    fn ping(&mut self) -> StoreResult<()> {
        redis::cmd("PING")
            .query::<String>(&mut self.conn)
            .map(|_| ())
            .map_err(|e| StoreError::PingFailed {
                addr: self.addr.clone(),
                reason: e.to_string(),
            })
    }
}

/// Decode a `[cursor, [key, ...]]` SCAN reply
///
/// Key names are binary-safe, so they are kept as raw bytes.
fn parse_scan_reply(reply: &Value) -> RedisResult<ScanPage> {
    let (next_cursor, keys): (u64, Vec<Vec<u8>>) = redis::from_redis_value(reply)?;
    Ok(ScanPage { keys, next_cursor })
}
