//! Crawler module for targeted page and document acquisition
//!
//! This module contains the core crawling logic, including:
//! - The frontier with at-most-once claim semantics
//! - Rendered page fetching with a degrade-to-partial-content timeout
//! - Document downloads with bounded retries and validation
//! - Page processing into sanitized markup, linear text and links
//! - Recording acquired content to the blob and record sinks
//! - Slot-based scheduling and overall crawl coordination

mod coordinator;
mod documents;
mod fetcher;
mod frontier;
mod processor;
mod recorder;
mod scheduler;

pub use coordinator::{Coordinator, CrawlReport};
pub use documents::{backoff_delay, DocumentFetcher, DocumentOutcome};
pub use fetcher::{
    build_http_client, fetch_page, user_agent, HttpRenderer, PageRenderer, RenderError,
    RenderedPage,
};
pub use frontier::{Frontier, FrontierEntry};
pub use processor::{document_title, process, PageLink, ProcessedPage};
pub use recorder::{AcquisitionRecorder, PageRecording};
pub use scheduler::{Scheduler, SlotLease};
