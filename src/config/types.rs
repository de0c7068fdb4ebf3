use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Campus-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub documents: DocumentConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
}

/// Crawl session behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Seed URL, crawled at depth 0
    pub start_url: String,

    /// Identifier stamped on every acquired record
    pub institute_id: String,

    /// Maximum depth to crawl from the seed URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages recorded per session
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum number of simultaneously in-flight fetch cycles
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Hard wall-clock bound on the whole session (seconds)
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Minimum time between fetch starts on one worker slot (milliseconds)
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// How long a page may take to go idle before partial content is used (milliseconds)
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Use the relevance oracle; false selects keyword link expansion
    #[serde(default)]
    pub enable_oracle: bool,
}

impl CrawlConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

/// Binary document acquisition settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DocumentConfig {
    /// Content type a document response must declare
    #[serde(default = "default_expected_content_type")]
    pub expected_content_type: String,

    /// Payloads smaller than this are treated as error pages
    #[serde(default = "default_min_bytes")]
    pub min_bytes: usize,

    /// Total transfer attempts per document
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubled on every further attempt (milliseconds)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            expected_content_type: default_expected_content_type(),
            min_bytes: default_min_bytes(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for acquired HTML and documents
    #[serde(rename = "blob-dir")]
    pub blob_dir: String,

    /// Path to the SQLite record index
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown crawl summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

/// Relevance oracle endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OracleConfig {
    /// HTTP endpoint receiving page text and known fields
    pub endpoint: String,

    /// Human-readable institution name passed along with every request
    pub institute_name: String,

    /// Attempts made when the oracle answers 429
    #[serde(default = "default_oracle_retries")]
    pub max_retries: u32,

    /// Field names tracked in the extracted-field map
    #[serde(default = "default_tracked_fields")]
    pub fields: Vec<String>,
}

fn default_max_depth() -> u32 {
    4
}

fn default_max_pages() -> usize {
    200
}

fn default_concurrency_limit() -> usize {
    10
}

fn default_session_timeout_secs() -> u64 {
    20 * 60
}

fn default_rate_limit_delay_ms() -> u64 {
    1000
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_expected_content_type() -> String {
    "application/pdf".to_string()
}

fn default_min_bytes() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_oracle_retries() -> u32 {
    5
}

/// Degree and diploma fields tracked when no list is configured
pub fn default_tracked_fields() -> Vec<String> {
    [
        "undergraduate_degrees",
        "undergraduate_specializations",
        "postgraduate_degrees",
        "postgraduate_specializations",
        "doctorate_degrees",
        "diploma_degrees",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
