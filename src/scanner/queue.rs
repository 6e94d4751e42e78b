//! Key queue with backpressure
//!
//! A bounded channel between the SCAN producer and the workers. When the
//! queue is full the producer blocks, which throttles enumeration to the
//! rate the workers can fetch values and bounds memory to the queue
//! capacity.
//!
//! Closing is implicit: once the producer's sender is dropped, workers
//! drain what is left and then see the channel as disconnected.

use crate::error::WorkerError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the key queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total keys enqueued
    pub enqueued: AtomicU64,

    /// Total keys dequeued
    pub dequeued: AtomicU64,

    /// Number of sends that found the queue full and had to wait
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (dequeued keys)
    pub fn throughput(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

/// Bounded key queue
pub struct KeyQueue {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    capacity: usize,
    stats: Arc<QueueStats>,
}

impl KeyQueue {
    /// Create a new key queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);

        Self {
            sender,
            receiver,
            capacity,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a receiver for this queue (one per worker)
    pub fn receiver(&self) -> KeyQueueReceiver {
        KeyQueueReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Give up the queue's own receiver and keep only the producer side
    ///
    /// Call after all worker receivers have been handed out. If every
    /// worker exits early, sends then fail instead of blocking forever.
    pub fn into_sender(self) -> KeyQueueSender {
        KeyQueueSender {
            sender: self.sender,
            stats: self.stats,
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Producer handle; dropping it closes the queue
pub struct KeyQueueSender {
    sender: Sender<Vec<u8>>,
    stats: Arc<QueueStats>,
}

impl KeyQueueSender {
    /// Send a key, blocking while the queue is full
    pub fn send(&self, key: Vec<u8>) -> Result<(), WorkerError> {
        match self.sender.try_send(key) {
            Ok(()) => {}
            Err(TrySendError::Full(key)) => {
                self.stats.backpressure_events.fetch_add(1, Ordering::Relaxed);
                self.sender.send(key).map_err(|_| WorkerError::QueueClosed)?;
            }
            Err(TrySendError::Disconnected(_)) => return Err(WorkerError::QueueClosed),
        }
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

/// Worker handle for receiving keys
#[derive(Clone)]
pub struct KeyQueueReceiver {
    receiver: Receiver<Vec<u8>>,
    stats: Arc<QueueStats>,
}

impl KeyQueueReceiver {
    /// Receive a key from the queue
    ///
    /// Blocks until a key is available. Returns `None` once the queue is
    /// closed and drained.
    pub fn recv(&self) -> Option<Vec<u8>> {
        match self.receiver.recv() {
            Ok(key) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(key)
            }
            Err(_) => None,
        }
    }

    /// Try to receive a key without blocking
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        match self.receiver.try_recv() {
            Ok(key) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(key)
            }
            Err(_) => None,
        }
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
