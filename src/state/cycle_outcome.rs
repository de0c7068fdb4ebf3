//! Outcome definitions for fetch cycles
//!
//! Every popped frontier entry ends in exactly one of these outcomes. Failures
//! are absorbed into an outcome rather than propagated, so one bad page never
//! stops its siblings or the scheduler loop.
use std::fmt;

/// How one fetch→process→propose→record cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CycleOutcome {
    // ===== Success =====
    /// Page was fetched, processed and recorded
    Recorded,

    // ===== Skips =====
    /// Another cycle already recorded this normalized URL
    Duplicate,

    /// Entry was deeper than the configured maximum depth
    DepthExceeded,

    /// Entry URL could not be parsed or is not http(s)
    InvalidUrl,

    // ===== Failures =====
    /// Renderer failed before any content was available
    FetchFailed,

    /// Blob or record sink rejected the page
    StoreFailed,
}

impl CycleOutcome {
    /// Returns true if the cycle produced a page record
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Recorded)
    }

    /// Returns true if the cycle was skipped without any network traffic
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Duplicate | Self::DepthExceeded | Self::InvalidUrl)
    }

    /// Returns true if the cycle failed after fetching started
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::StoreFailed)
    }

    /// Stable lowercase name used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Duplicate => "duplicate",
            Self::DepthExceeded => "depth_exceeded",
            Self::InvalidUrl => "invalid_url",
            Self::FetchFailed => "fetch_failed",
            Self::StoreFailed => "store_failed",
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> Vec<Self> {
        vec![
            Self::Recorded,
            Self::Duplicate,
            Self::DepthExceeded,
            Self::InvalidUrl,
            Self::FetchFailed,
            Self::StoreFailed,
        ]
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
