//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl session loop, including:
//! - Seeding the frontier and launching bounded-concurrency fetch cycles
//! - The fetch → process → propose → record cycle for one frontier entry
//! - Draining in-flight cycles once the frontier or page cap runs out
//! - Enforcing the session timeout and producing the final report

use crate::config::{default_tracked_fields, Config};
use crate::crawler::documents::{DocumentFetcher, DocumentOutcome};
use crate::crawler::fetcher::{fetch_page, PageRenderer};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::processor::{process, ProcessedPage};
use crate::crawler::recorder::AcquisitionRecorder;
use crate::crawler::scheduler::Scheduler;
use crate::oracle::{keyword_proposal, propose, OracleRequest, Proposal, RelevanceOracle};
use crate::state::{CrawlOutcome, CrawlState, CycleOutcome, FieldMap};
use crate::storage::{AcquiredRecord, BlobStore, FileKind, RecordStore};
use crate::url::registered_domain;
use crate::{HarvestError, UrlError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Final result of a crawl session
///
/// Always produced, even when the session timed out; it then holds whatever
/// was recorded before the timeout.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub institute_id: String,
    pub start_url: String,

    /// Every record written, in write order
    pub records: Vec<AcquiredRecord>,

    /// Final extracted-field map
    pub fields: FieldMap,

    pub pages_recorded: usize,
    pub documents_recorded: usize,

    /// Document URLs attempted, whether or not they produced a record
    pub documents_attempted: usize,

    /// Entries still waiting in the frontier at termination
    pub frontier_remaining: usize,

    /// Why the session stopped
    pub outcome: CrawlOutcome,

    /// Tally of finished cycles by outcome
    pub cycles: BTreeMap<CycleOutcome, usize>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Wall-clock duration of the session
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Everything a fetch cycle needs, shared by all in-flight cycles
struct Session {
    institute_id: String,
    institute_name: String,
    seed_url: Url,
    base_domain: String,
    max_depth: u32,
    render_timeout: Duration,
    renderer: Arc<dyn PageRenderer>,
    oracle: Option<Arc<dyn RelevanceOracle>>,
    frontier: Frontier,
    documents: DocumentFetcher,
    recorder: AcquisitionRecorder,
    state: Mutex<CrawlState>,
}

impl Session {
    fn state(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pages_recorded(&self) -> usize {
        self.state().pages_recorded
    }

    fn oracle_request(&self, url: &Url, page: &ProcessedPage) -> OracleRequest {
        let state = self.state();
        OracleRequest {
            institute_name: self.institute_name.clone(),
            base_domain: self.base_domain.clone(),
            page_url: url.to_string(),
            text: page.linear_text.clone(),
            known_fields: state.fields.clone(),
            empty_fields: state.empty_fields(),
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    session: Arc<Session>,
    scheduler: Scheduler,
    records: Arc<dyn RecordStore>,
    session_timeout: Duration,
}

impl Coordinator {
    /// Creates a coordinator with the frontier seeded by the start URL
    ///
    /// # Arguments
    ///
    /// * `config` - Validated session configuration
    /// * `client` - HTTP client used for document downloads
    /// * `renderer` - Page rendering backend, shared by all cycles
    /// * `blobs` - Blob sink for page markup and documents
    /// * `records` - Record sink
    ///
    /// Without `with_oracle` the keyword fallback steers the frontier.
    pub fn new(
        config: Config,
        client: Client,
        renderer: Arc<dyn PageRenderer>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, HarvestError> {
        let crawl = &config.crawl;
        let seed_url = Url::parse(&crawl.start_url)?;
        let base_domain = seed_url
            .host_str()
            .map(registered_domain)
            .ok_or(UrlError::MissingDomain)?;

        let (institute_name, tracked_fields) = match &config.oracle {
            Some(oracle) => (oracle.institute_name.clone(), oracle.fields.clone()),
            None => (
                crawl.institute_id.clone(),
                default_tracked_fields(),
            ),
        };

        let session = Session {
            institute_id: crawl.institute_id.clone(),
            institute_name,
            base_domain,
            max_depth: crawl.max_depth,
            render_timeout: crawl.render_timeout(),
            renderer,
            oracle: None,
            frontier: Frontier::seeded(seed_url.as_str()),
            documents: DocumentFetcher::new(client, config.documents.clone()),
            recorder: AcquisitionRecorder::new(crawl.institute_id.clone(), blobs, Arc::clone(&records)),
            state: Mutex::new(CrawlState::new(&tracked_fields)),
            seed_url,
        };

        Ok(Self {
            session: Arc::new(session),
            scheduler: Scheduler::new(
                crawl.concurrency_limit,
                crawl.rate_limit_delay(),
                crawl.max_pages,
            ),
            records,
            session_timeout: crawl.session_timeout(),
        })
    }

    /// Steers the frontier with a relevance oracle instead of keywords
    pub fn with_oracle(mut self, oracle: Arc<dyn RelevanceOracle>) -> Self {
        if let Some(session) = Arc::get_mut(&mut self.session) {
            session.oracle = Some(oracle);
        }
        self
    }

    /// Runs the crawl session to completion
    ///
    /// Launches cycles while a slot is free and the page cap allows, then
    /// waits for at least one to finish before re-evaluating. Stops when the
    /// frontier is exhausted with nothing in flight, when the page cap is
    /// reached and in-flight cycles have drained, or when the session timeout
    /// fires; outstanding cycles are then aborted and their results dropped.
    ///
    /// Never fails: per-cycle errors become `CycleOutcome`s.
    pub async fn run(mut self) -> CrawlReport {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.session_timeout;
        let mut tasks: JoinSet<(usize, CycleOutcome)> = JoinSet::new();

        info!(
            "Starting crawl of {} for institute {} ({} mode)",
            self.session.seed_url,
            self.session.institute_id,
            if self.session.oracle.is_some() { "oracle" } else { "keyword" }
        );

        let outcome = loop {
            if Instant::now() >= deadline {
                break self.time_out(&mut tasks);
            }

            self.launch(&mut tasks);

            if tasks.is_empty() {
                let recorded = self.session.pages_recorded();
                if self.scheduler.page_cap_reached(recorded) {
                    info!("Reached page cap of {} pages", recorded);
                    break CrawlOutcome::PageCapReached;
                }
                info!("Frontier exhausted");
                break CrawlOutcome::Exhausted;
            }

            match timeout_at(deadline, tasks.join_next()).await {
                Err(_) => break self.time_out(&mut tasks),
                Ok(Some(Ok((slot, cycle)))) => {
                    self.scheduler.release(slot);
                    self.session.state().record_outcome(cycle);
                }
                Ok(Some(Err(e))) => {
                    // The slot of a panicked cycle stays leased; capacity shrinks by one
                    error!("Fetch cycle aborted: {}", e);
                }
                Ok(None) => {}
            }
        };

        self.finish(outcome, started_at)
    }

    /// Pops and launches entries while capacity allows
    fn launch(&mut self, tasks: &mut JoinSet<(usize, CycleOutcome)>) {
        loop {
            let recorded = self.session.pages_recorded();
            if !self.scheduler.has_capacity(recorded) {
                return;
            }

            let Some(entry) = self.session.frontier.pop() else {
                return;
            };

            if entry.depth > self.session.max_depth {
                debug!("Discarding {} at depth {}", entry.url, entry.depth);
                self.session.state().record_outcome(CycleOutcome::DepthExceeded);
                continue;
            }

            let Some(lease) = self.scheduler.acquire(std::time::Instant::now()) else {
                warn!("No free slot for {}; entry dropped", entry.url);
                return;
            };

            let session = Arc::clone(&self.session);
            let not_before = Instant::from_std(lease.not_before);
            tasks.spawn(async move {
                sleep_until(not_before).await;
                (lease.slot, run_cycle(&session, entry).await)
            });
        }
    }

    fn time_out(&self, tasks: &mut JoinSet<(usize, CycleOutcome)>) -> CrawlOutcome {
        warn!(
            "Session timeout of {:?} reached with {} cycles in flight",
            self.session_timeout,
            tasks.len()
        );
        tasks.abort_all();
        CrawlOutcome::TimedOut
    }

    /// Persists the final field map and builds the report
    fn finish(self, outcome: CrawlOutcome, started_at: DateTime<Utc>) -> CrawlReport {
        let session = &self.session;
        let (fields, cycles) = {
            let state = session.state();
            (state.fields.clone(), state.outcomes.clone())
        };

        if let Err(e) = self.records.put_fields(&session.institute_id, &fields) {
            error!("Failed to persist extracted fields: {}", e);
        }

        let report = CrawlReport {
            institute_id: session.institute_id.clone(),
            start_url: session.seed_url.to_string(),
            records: session.recorder.records(),
            fields,
            pages_recorded: session.recorder.count(FileKind::Html),
            documents_recorded: session.recorder.count(FileKind::Pdf),
            documents_attempted: session.documents.attempted_count(),
            frontier_remaining: session.frontier.size(),
            outcome,
            cycles,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Crawl {}: {} pages, {} documents in {:.1}s",
            report.outcome,
            report.pages_recorded,
            report.documents_recorded,
            report.elapsed().as_secs_f64()
        );

        report
    }
}

/// One fetch → process → propose → record cycle
async fn run_cycle(session: &Session, entry: FrontierEntry) -> CycleOutcome {
    let url = match Url::parse(&entry.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Invalid frontier URL {}: {}", entry.url, e);
            return CycleOutcome::InvalidUrl;
        }
    };

    info!("Visiting {} (depth {})", url, entry.depth);

    let Some(raw) = fetch_page(session.renderer.as_ref(), url.as_str(), session.render_timeout).await
    else {
        return CycleOutcome::FetchFailed;
    };

    let page = process(&raw, &url);

    let proposal = match &session.oracle {
        Some(oracle) => {
            let request = session.oracle_request(&url, &page);
            propose(oracle.as_ref(), &request, &url, &session.seed_url).await
        }
        None => keyword_proposal(&page, &session.seed_url),
    };

    let Proposal {
        new_page_urls,
        new_document_urls,
        updated_fields,
        metadata,
    } = proposal;

    let outcome = match session.recorder.record_page_tracked(
        &url,
        &page.title,
        &page.sanitized_markup,
        metadata,
    ) {
        Some(recording) if recording.newly_written => {
            session.state().pages_recorded += 1;
            CycleOutcome::Recorded
        }
        Some(_) => CycleOutcome::Duplicate,
        None => CycleOutcome::StoreFailed,
    };

    for document_url in new_document_urls {
        if let DocumentOutcome::Fetched { bytes, .. } =
            session.documents.fetch_document(document_url.as_str()).await
        {
            session.recorder.record_document(&document_url, &bytes);
        }
    }

    if !updated_fields.is_empty() {
        session.state().merge_fields(updated_fields);
    }

    if entry.depth < session.max_depth {
        let depth = entry.depth + 1;
        let queued = new_page_urls
            .iter()
            .filter(|candidate| session.frontier.push(candidate.as_str(), depth))
            .count();
        debug!("Queued {} new pages from {} at depth {}", queued, url, depth);
    } else if !new_page_urls.is_empty() {
        debug!(
            "Not following {} links from {}: depth limit reached",
            new_page_urls.len(),
            url
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::fetcher::{RenderError, RenderedPage};
    use crate::storage::{MemoryBlobStore, MemoryRecordStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves pages from a map and counts how often each URL is opened
    struct FakeSite {
        pages: HashMap<String, String>,
        opened: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    struct FakePage {
        content: Option<String>,
    }

    #[async_trait]
    impl PageRenderer for FakeSite {
        async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>, RenderError> {
            self.opened.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.pages.get(url) {
                Some(content) => Ok(Box::new(FakePage {
                    content: Some(content.clone()),
                })),
                None => Err(RenderError::Status(404)),
            }
        }
    }

    #[async_trait]
    impl RenderedPage for FakePage {
        async fn wait_until_idle(&mut self) -> Result<(), RenderError> {
            Ok(())
        }

        async fn content(&mut self) -> Result<String, RenderError> {
            self.content.take().ok_or(RenderError::Navigation("closed".to_string()))
        }
    }

    fn fake_site(pages: &[(&str, &str)], delay: Duration) -> Arc<FakeSite> {
        Arc::new(FakeSite {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            opened: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        })
    }

    fn config(extra: &str) -> Config {
        let toml = format!(
            r#"
[crawl]
start-url = "https://example.edu/"
institute-id = "1042"
rate-limit-delay-ms = 0
{}

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[output]
blob-dir = "./blobs"
database-path = "./harvest.db"
"#,
            extra
        );
        parse_config(&toml).unwrap()
    }

    fn coordinator(config: Config, site: Arc<FakeSite>) -> (Coordinator, Arc<MemoryRecordStore>) {
        let records = Arc::new(MemoryRecordStore::new());
        let coordinator = Coordinator::new(
            config,
            Client::new(),
            site,
            Arc::new(MemoryBlobStore::new()),
            records.clone(),
        )
        .unwrap();
        (coordinator, records)
    }

    /// A chain of course pages, each linking to the next
    fn chain(len: usize) -> Vec<(String, String)> {
        (0..len)
            .map(|i| {
                let url = if i == 0 {
                    "https://example.edu/".to_string()
                } else {
                    format!("https://example.edu/course/{}", i)
                };
                let html = format!(
                    "<title>Course {}</title><a href=\"/course/{}\">Course {}</a>",
                    i,
                    i + 1,
                    i + 1
                );
                (url, html)
            })
            .collect()
    }

    fn borrowed(pages: &[(String, String)]) -> Vec<(&str, &str)> {
        pages.iter().map(|(u, h)| (u.as_str(), h.as_str())).collect()
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let pages = chain(6);
        let site = fake_site(&borrowed(&pages), Duration::ZERO);
        let (coordinator, _) = coordinator(config("max-depth = 2"), site.clone());

        let report = coordinator.run().await;

        assert_eq!(report.outcome, CrawlOutcome::Exhausted);
        assert_eq!(report.pages_recorded, 3);
        let opened = site.opened.lock().unwrap().clone();
        assert_eq!(
            opened,
            vec![
                "https://example.edu/",
                "https://example.edu/course/1",
                "https://example.edu/course/2"
            ]
        );
    }

    #[tokio::test]
    async fn test_page_cap() {
        let pages = chain(10);
        let site = fake_site(&borrowed(&pages), Duration::ZERO);
        let (coordinator, records) =
            coordinator(config("max-depth = 20\nmax-pages = 4"), site.clone());

        let report = coordinator.run().await;

        assert_eq!(report.outcome, CrawlOutcome::PageCapReached);
        assert_eq!(report.pages_recorded, 4);
        assert_eq!(records.records().len(), 4);
        assert_eq!(site.opened.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let mut html = String::from("<title>Courses</title>");
        let mut pages = Vec::new();
        for i in 0..12 {
            html.push_str(&format!("<a href=\"/course/{}\">Course {}</a>", i, i));
            pages.push((format!("https://example.edu/course/{}", i), "<p>Syllabus</p>".to_string()));
        }
        pages.push(("https://example.edu/".to_string(), html));

        let site = fake_site(&borrowed(&pages), Duration::from_millis(20));
        let (coordinator, _) = coordinator(config("concurrency-limit = 3"), site.clone());

        let report = coordinator.run().await;

        assert_eq!(report.pages_recorded, 13);
        assert!(site.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(report.cycles.get(&CycleOutcome::Recorded), Some(&13));
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_siblings() {
        let site = fake_site(
            &[
                (
                    "https://example.edu/",
                    "<title>Home</title><a href=\"/admissions\">Admissions</a><a href=\"/fees\">Fees</a>",
                ),
                ("https://example.edu/fees", "<title>Fees</title>"),
            ],
            Duration::ZERO,
        );
        let (coordinator, _) = coordinator(config(""), site);

        let report = coordinator.run().await;

        assert_eq!(report.outcome, CrawlOutcome::Exhausted);
        assert_eq!(report.pages_recorded, 2);
        assert_eq!(report.cycles.get(&CycleOutcome::FetchFailed), Some(&1));
    }

    #[tokio::test]
    async fn test_session_timeout() {
        let site = fake_site(
            &[("https://example.edu/", "<title>Home</title>")],
            Duration::from_secs(60),
        );
        let (coordinator, records) = coordinator(config("session-timeout-secs = 1"), site);

        let started = std::time::Instant::now();
        let report = coordinator.run().await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.outcome, CrawlOutcome::TimedOut);
        assert_eq!(report.pages_recorded, 0);
        // The field map is still persisted
        assert!(records.fields("1042").is_some());
    }

    #[tokio::test]
    async fn test_fields_start_empty_and_are_persisted() {
        let site = fake_site(&[("https://example.edu/", "<title>Home</title>")], Duration::ZERO);
        let (coordinator, records) = coordinator(config(""), site);

        let report = coordinator.run().await;

        let fields = records.fields("1042").unwrap();
        assert_eq!(fields, report.fields);
        assert!(fields.contains_key("undergraduate_degrees"));
        assert!(fields.values().all(|v| v.as_array().is_some_and(|a| a.is_empty())));
    }
}
