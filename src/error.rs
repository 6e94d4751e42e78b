//! Error types for redis-inventory
//!
//! This module defines the error hierarchy for the inventory run:
//! - Store connection and command errors
//! - Configuration and CLI errors
//! - Worker thread errors
//! - CSV export errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Per-key command failures are expected (keys vanish mid-scan) and are
//!   surfaced as [`KeyOutcome::Skipped`], never as a run-level error
//! - Everything else is fatal and propagates to `main`

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the inventory run
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Store connection and command errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Could not open a connection
    #[error("Failed to connect to '{addr}': {reason}")]
    ConnectionFailed { addr: String, reason: String },

    /// Connection opened but PING did not succeed
    #[error("Store at '{addr}' did not answer PING: {reason}")]
    PingFailed { addr: String, reason: String },

    /// SCAN failed mid-enumeration
    #[error("SCAN failed at cursor {cursor}: {reason}")]
    ScanFailed { cursor: u64, reason: String },

    /// A per-key command (TTL, GET) failed
    #[error("{command} failed for key '{key}': {reason}")]
    Command {
        command: &'static str,
        key: String,
        reason: String,
    },

    /// Key disappeared between enumeration and fetch
    #[error("Key '{key}' no longer exists")]
    KeyMissing { key: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid SCAN page size hint
    #[error("Invalid scan count {count}: must be at least 1")]
    InvalidScanCount { count: usize },

    /// Unparseable store address
    #[error("Invalid store address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// Export path error
    #[error("Invalid export path '{path}': {reason}")]
    InvalidExportPath { path: PathBuf, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Work queue closed while the producer still had keys
    #[error("Key queue closed unexpectedly")]
    QueueClosed,
}

/// CSV export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// Could not create the output file
    #[error("Failed to create '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or flushing a record failed
    #[error("Failed to write '{path}': {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Result type alias for AnalyzerError
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for ExportError
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Represents the outcome of processing a single key
#[derive(Debug)]
pub enum KeyOutcome {
    /// Both fetches succeeded and the key was applied to the aggregators
    Recorded { key: Vec<u8>, size: u64 },

    /// TTL or GET failed; the key contributes to nothing
    Skipped { key: Vec<u8>, error: StoreError },
}

impl KeyOutcome {
    /// Returns true if this outcome represents a recorded key
    pub fn is_recorded(&self) -> bool {
        matches!(self, KeyOutcome::Recorded { .. })
    }

    /// Returns the key associated with this outcome
    pub fn key(&self) -> &[u8] {
        match self {
            KeyOutcome::Recorded { key, .. } => key,
            KeyOutcome::Skipped { key, .. } => key,
        }
    }
}
