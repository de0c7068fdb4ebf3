//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: session-wide field map and counters, guarded by one lock
//! - `CycleOutcome`: how a single fetch cycle ended
//! - `CrawlOutcome`: why the whole session stopped
//! - `SlotState`: per-worker-slot fetch timing for rate limiting

mod crawl_state;
mod cycle_outcome;
mod slot_state;

// Re-export main types
pub use crawl_state::{empty_fields, CrawlOutcome, CrawlState, FieldMap};
pub use cycle_outcome::CycleOutcome;
pub use slot_state::SlotState;
