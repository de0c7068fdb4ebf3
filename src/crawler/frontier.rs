//! Crawl frontier
//!
//! The frontier is the pending work queue plus the visited set. Both live under
//! one lock so that popping an entry and claiming its normalized URL happen
//! atomically: no two concurrent callers can ever claim the same target.

use crate::url::{normalize, NormalizedUrl};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A pending crawl target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Absolute URL as discovered
    pub url: String,

    /// Link distance from the seed; the seed is depth 0
    pub depth: u32,

    /// Dedup key of `url`
    pub key: NormalizedUrl,
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<NormalizedUrl>,
    visited: HashSet<NormalizedUrl>,
}

/// Thread-safe FIFO frontier with at-most-once claim semantics
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding exactly the seed URL at depth 0
    pub fn seeded(start_url: &str) -> Self {
        let frontier = Self::new();
        frontier.push(start_url, 0);
        frontier
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues a URL at `depth`
    ///
    /// No-op when the URL's normalized form has already been claimed or is
    /// already waiting in the queue, or when the URL cannot be normalized.
    ///
    /// # Returns
    ///
    /// `true` if a new entry was enqueued
    pub fn push(&self, url: &str, depth: u32) -> bool {
        let key = match normalize(url) {
            Ok(key) => key,
            Err(e) => {
                debug!("Not queueing {}: {}", url, e);
                return false;
            }
        };

        let mut inner = self.lock();
        if inner.visited.contains(&key) || inner.queued.contains(&key) {
            return false;
        }

        inner.queued.insert(key.clone());
        inner.queue.push_back(FrontierEntry {
            url: url.to_string(),
            depth,
            key,
        });
        true
    }

    /// Claims and removes the next entry
    ///
    /// The entry's normalized URL is inserted into the visited set under the
    /// same lock as the removal.
    pub fn pop(&self) -> Option<FrontierEntry> {
        let mut inner = self.lock();
        while let Some(entry) = inner.queue.pop_front() {
            inner.queued.remove(&entry.key);
            if inner.visited.insert(entry.key.clone()) {
                return Some(entry);
            }
        }
        None
    }

    /// Number of entries waiting to be claimed
    pub fn size(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if no entry is waiting
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns true if the URL's normalized form has been claimed
    #[cfg(test)]
    pub fn is_visited(&self, url: &str) -> bool {
        match normalize(url) {
            Ok(key) => self.lock().visited.contains(&key),
            Err(_) => false,
        }
    }

    /// Number of targets claimed so far
    #[cfg(test)]
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }
}
