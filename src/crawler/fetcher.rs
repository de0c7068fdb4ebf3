//! Page fetching
//!
//! This module handles acquiring page content for the crawler:
//! - The `PageRenderer` / `RenderedPage` seam a rendering backend plugs into
//! - `fetch_page`, which bounds the wait and degrades to partial content
//! - `HttpRenderer`, a plain HTTP backend that streams the body
//! - Building HTTP clients with proper user agent strings

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Errors raised by a rendering backend
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Content-Type is not a page: {0}")]
    ContentMismatch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A rendering backend that opens pages
///
/// One renderer is shared by every concurrent cycle; each `open` yields an
/// independent page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Starts loading `url`
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>, RenderError>;
}

/// A page being loaded by a `PageRenderer`
#[async_trait]
pub trait RenderedPage: Send {
    /// Resolves once the page has finished loading
    ///
    /// Callers may drop this future at any point; whatever was loaded up to
    /// then must remain readable through `content`.
    async fn wait_until_idle(&mut self) -> Result<(), RenderError>;

    /// Returns the content loaded so far
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Releases the page
    async fn close(&mut self) {}
}

/// Fetches rendered page content with a bounded wait
///
/// The whole fetch shares one deadline of `render_timeout`. If the page does
/// not settle in time, whatever content is available is returned instead.
/// Any other failure is logged and yields `None`; the URL is not retried.
///
/// # Arguments
///
/// * `renderer` - The rendering backend
/// * `url` - The page to fetch
/// * `render_timeout` - Upper bound on the wait for the page to settle
pub async fn fetch_page(
    renderer: &dyn PageRenderer,
    url: &str,
    render_timeout: Duration,
) -> Option<String> {
    let deadline = Instant::now() + render_timeout;

    let mut page = match timeout_at(deadline, renderer.open(url)).await {
        Ok(Ok(page)) => page,
        Ok(Err(e)) => {
            warn!("Failed to open {}: {}", url, e);
            return None;
        }
        Err(_) => {
            warn!("Timed out opening {} after {:?}", url, render_timeout);
            return None;
        }
    };

    match timeout_at(deadline, page.wait_until_idle()).await {
        Ok(Ok(())) => {}
        Ok(Err(RenderError::Timeout)) | Err(_) => {
            warn!(
                "{} did not settle within {:?}, using partial content",
                url, render_timeout
            );
        }
        Ok(Err(e)) => {
            warn!("Error rendering {}: {}", url, e);
            page.close().await;
            return None;
        }
    }

    let content = page.content().await;
    page.close().await;

    match content {
        Ok(content) => {
            debug!("Fetched {} ({} bytes)", url, content.len());
            Some(content)
        }
        Err(e) => {
            warn!("Failed to read content of {}: {}", url, e);
            None
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use campus_harvest::config::UserAgentConfig;
/// use campus_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CampusHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent: `CrawlerName/Version (+ContactURL)`
pub fn user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    )
}

/// Renderer that fetches pages over plain HTTP
///
/// `wait_until_idle` streams the body chunk by chunk into a buffer, so a body
/// that never finishes still leaves its received prefix readable.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>, RenderError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status(status.as_u16()));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            let content_type = content_type.to_ascii_lowercase();
            if !content_type.contains("html") && !content_type.starts_with("text/") {
                return Err(RenderError::ContentMismatch(content_type));
            }
        }

        Ok(Box::new(HttpPage {
            response: Some(response),
            buffer: Vec::new(),
        }))
    }
}

struct HttpPage {
    response: Option<Response>,
    buffer: Vec<u8>,
}

#[async_trait]
impl RenderedPage for HttpPage {
    async fn wait_until_idle(&mut self) -> Result<(), RenderError> {
        if let Some(response) = self.response.as_mut() {
            while let Some(chunk) = response.chunk().await? {
                self.buffer.extend_from_slice(&chunk);
            }
        }
        self.response = None;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        Ok(String::from_utf8_lossy(&self.buffer).into_owned())
    }

    async fn close(&mut self) {
        self.response = None;
    }
}
