//! Launch capacity and per-slot rate limiting
//!
//! This module handles:
//! - Bounding the number of in-flight fetch cycles
//! - Refusing launches that could overshoot the page cap
//! - Enforcing a minimum delay between fetch starts on each worker slot
//!
//! The scheduler is owned by the coordinator loop and never shared across
//! tasks, so it needs no locking.

use crate::state::SlotState;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// A worker slot handed to one fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLease {
    /// Slot index, returned through `Scheduler::release`
    pub slot: usize,

    /// The cycle must not start its fetch before this instant
    pub not_before: Instant,
}

/// Scheduler for concurrent fetch cycles
///
/// Each of the `concurrency_limit` slots carries its own fetch timing, so the
/// minimum delay bounds the request rate without serializing the crawl.
pub struct Scheduler {
    /// Per-slot timing
    slots: Vec<SlotState>,

    /// Slots not currently leased
    free: BTreeSet<usize>,

    /// Minimum delay between fetch starts on one slot
    min_delay: Duration,

    /// Page cap for the session
    max_pages: usize,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `concurrency_limit` - Number of worker slots (at least 1)
    /// * `min_delay` - Minimum delay between fetch starts per slot
    /// * `max_pages` - Page cap for the session
    pub fn new(concurrency_limit: usize, min_delay: Duration, max_pages: usize) -> Self {
        let concurrency_limit = concurrency_limit.max(1);
        Self {
            slots: vec![SlotState::new(); concurrency_limit],
            free: (0..concurrency_limit).collect(),
            min_delay,
            max_pages,
        }
    }

    /// Number of leased slots
    pub fn in_flight(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns true once `recorded` pages meet the page cap
    pub fn page_cap_reached(&self, recorded: usize) -> bool {
        recorded >= self.max_pages
    }

    /// Checks whether another cycle may launch
    ///
    /// A cycle may launch when a slot is free and, even if every in-flight
    /// cycle records its page, the new one cannot push past the page cap.
    pub fn has_capacity(&self, recorded: usize) -> bool {
        !self.free.is_empty() && recorded + self.in_flight() < self.max_pages
    }

    /// Leases the free slot that may fetch soonest
    ///
    /// The fetch start is recorded against the slot at the returned
    /// `not_before`, so the next lease of the same slot is spaced by the
    /// minimum delay. Returns None if every slot is leased.
    pub fn acquire(&mut self, now: Instant) -> Option<SlotLease> {
        let slot = *self
            .free
            .iter()
            .min_by_key(|&&slot| self.slots[slot].next_allowed(self.min_delay, now))?;

        self.free.remove(&slot);
        let state = &mut self.slots[slot];
        let not_before = state.next_allowed(self.min_delay, now);
        state.record_fetch(not_before);

        tracing::trace!(
            "Leased slot {} (fetch #{}) not before {:?} from now",
            slot,
            state.fetch_count,
            not_before.saturating_duration_since(now)
        );

        Some(SlotLease { slot, not_before })
    }

    /// Returns a slot to the free pool
    pub fn release(&mut self, slot: usize) {
        if slot < self.slots.len() {
            self.free.insert(slot);
        }
    }
}
