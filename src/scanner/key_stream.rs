//! Cursor-driven key enumeration
//!
//! [`KeyStream`] turns the store's SCAN protocol into a plain iterator.
//! Only the current page is held in memory. The stream starts at cursor
//! 0 and ends when the store hands back cursor 0 again.
//!
//! An enumeration error is yielded once, after which the stream is
//! exhausted. Callers treat it as fatal; there is no retry.

use crate::error::StoreResult;
use crate::store::{KeyStore, SCAN_CURSOR_START};
use std::collections::VecDeque;
use tracing::trace;

/// Lazy, finite, non-restartable sequence of raw key names
pub struct KeyStream<'a, S: KeyStore + ?Sized> {
    store: &'a mut S,
    pattern: String,
    count: usize,
    cursor: u64,
    page: VecDeque<Vec<u8>>,
    finished: bool,
    pages_fetched: u64,
    keys_yielded: u64,
}

impl<'a, S: KeyStore + ?Sized> KeyStream<'a, S> {
    /// Enumerate keys matching `pattern`, asking for about `count` per page
    pub fn new(store: &'a mut S, pattern: impl Into<String>, count: usize) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            count,
            cursor: SCAN_CURSOR_START,
            page: VecDeque::new(),
            finished: false,
            pages_fetched: 0,
            keys_yielded: 0,
        }
    }

    /// SCAN calls made so far
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Keys handed out so far
    pub fn keys_yielded(&self) -> u64 {
        self.keys_yielded
    }

    /// Pull pages until one has keys or the iteration ends
    fn fill(&mut self) -> StoreResult<()> {
        while self.page.is_empty() && !self.finished {
            let page = self
                .store
                .scan_page(self.cursor, &self.pattern, self.count)?;

            self.pages_fetched += 1;
            trace!(
                cursor = self.cursor,
                next = page.next_cursor,
                keys = page.keys.len(),
                "Fetched page"
            );

            self.page.extend(page.keys);
            self.cursor = page.next_cursor;
            if self.cursor == SCAN_CURSOR_START {
                self.finished = true;
            }
        }
        Ok(())
    }
}

impl<S: KeyStore + ?Sized> Iterator for KeyStream<'_, S> {
    type Item = StoreResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.fill() {
            self.finished = true;
            self.page.clear();
            return Some(Err(e));
        }

        let key = self.page.pop_front()?;
        self.keys_yielded += 1;
        Some(Ok(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, Ttl};

    fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store.insert(format!("key:{:04}", i), "v", Ttl::NO_EXPIRY);
        }
        store
    }

    #[test]
    fn test_stream_yields_every_key_once() {
        let mut store = store_with(1234);
        let mut stream = KeyStream::new(&mut store, "*", 100);

        let keys: Vec<Vec<u8>> = stream.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(keys.len(), 1234);

        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 1234);

        assert_eq!(stream.pages_fetched(), 13);
        assert_eq!(stream.keys_yielded(), 1234);
    }

    #[test]
    fn test_stream_skips_empty_pages() {
        let mut store = store_with(50);
        store.insert("match:me", "v", Ttl::NO_EXPIRY);

        let keys: Vec<Vec<u8>> = KeyStream::new(&mut store, "match:*", 5)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(keys, vec![b"match:me".to_vec()]);
    }

    #[test]
    fn test_stream_empty_store() {
        let mut store = MemoryStore::new();
        let mut stream = KeyStream::new(&mut store, "*", 10);
        assert!(stream.next().is_none());
        assert_eq!(stream.pages_fetched(), 1);
    }

    #[test]
    fn test_stream_error_then_fused() {
        let mut store = store_with(30);
        store.fail_scan_after(2);

        let mut stream = KeyStream::new(&mut store, "*", 10);
        let mut ok = 0;
        let mut errors = 0;
        for item in stream.by_ref() {
            match item {
                Ok(_) => ok += 1,
                Err(StoreError::ScanFailed { cursor, .. }) => {
                    assert_eq!(cursor, 20);
                    errors += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 20);
        assert_eq!(errors, 1);
        assert!(stream.next().is_none());
    }
}
