use std::time::{Duration, Instant};

/// Tracks fetch timing for one concurrent worker slot
///
/// A slot is a unit of launch capacity. Rate limiting is applied per slot, so
/// with N slots at most N fetches start per `min_delay` interval.
#[derive(Debug, Clone, Default)]
pub struct SlotState {
    /// Number of fetches started on this slot
    pub fetch_count: u32,

    /// When the most recent fetch on this slot started
    pub last_fetch_start: Option<Instant>,
}

impl SlotState {
    /// Creates a slot that has never fetched
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a fetch starts on this slot at `now`
    pub fn record_fetch(&mut self, now: Instant) {
        self.fetch_count += 1;
        self.last_fetch_start = Some(now);
    }

    /// Earliest instant at which the next fetch may start
    pub fn next_allowed(&self, min_delay: Duration, now: Instant) -> Instant {
        match self.last_fetch_start {
            Some(last) => (last + min_delay).max(now),
            None => now,
        }
    }
}
