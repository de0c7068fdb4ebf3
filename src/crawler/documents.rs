//! Binary document acquisition
//!
//! Documents are fetched over plain HTTP with a bounded retry loop for
//! transport failures, then validated by declared content type and size.
//! Every document URL is claimed in the downloaded set before the first
//! request, so a document is attempted at most once per session whatever
//! the outcome.

use crate::config::DocumentConfig;
use crate::url::{normalize, NormalizedUrl};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a document fetch
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Document passed validation
    Fetched {
        /// Response body
        bytes: Vec<u8>,
        /// Declared Content-Type
        content_type: String,
    },

    /// The URL was already attempted in this session; no request was made
    AlreadyAttempted,

    /// The URL cannot be normalized
    InvalidUrl,

    /// Declared Content-Type is not the expected document type
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Payload below the minimum size, likely an error page
    TooSmall {
        /// Bytes received
        size: usize,
    },

    /// Transfer failed permanently or retries were exhausted
    Failed {
        /// Error description
        error: String,
        /// Attempts made
        attempts: u32,
    },
}

/// Why one transfer attempt failed
enum TransferError {
    /// Worth another attempt: connect/timeout/body errors, 5xx, 429
    Retryable(String),
    /// Not worth another attempt
    Fatal(String),
}

/// Successful transfer, before size validation
enum Transfer {
    Body { bytes: Vec<u8>, content_type: String },
    WrongType(String),
}

/// Fetches binary documents and owns the downloaded set
pub struct DocumentFetcher {
    client: Client,
    config: DocumentConfig,
    downloaded: Mutex<HashSet<NormalizedUrl>>,
}

impl DocumentFetcher {
    pub fn new(client: Client, config: DocumentConfig) -> Self {
        Self {
            client,
            config,
            downloaded: Mutex::new(HashSet::new()),
        }
    }

    /// Claims a document key; returns false if it was already claimed
    fn claim(&self, key: NormalizedUrl) -> bool {
        self.downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    /// Returns true if the URL has already been attempted
    pub fn is_attempted(&self, url: &str) -> bool {
        match normalize(url) {
            Ok(key) => self
                .downloaded
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&key),
            Err(_) => false,
        }
    }

    /// Number of document URLs attempted so far
    pub fn attempted_count(&self) -> usize {
        self.downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Fetches a document, at most once per normalized URL per session
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Connect error, timeout, body read error | Retry with backoff |
    /// | HTTP 5xx, HTTP 429 | Retry with backoff |
    /// | Other non-2xx | Fail immediately |
    /// | Wrong Content-Type | Reject, no retry |
    /// | Payload below `min-bytes` | Reject, no retry |
    ///
    /// The delay before attempt `n + 1` is `backoff-base-ms * 2^(n - 1)`.
    pub async fn fetch_document(&self, url: &str) -> DocumentOutcome {
        let key = match normalize(url) {
            Ok(key) => key,
            Err(e) => {
                debug!("Skipping document {}: {}", url, e);
                return DocumentOutcome::InvalidUrl;
            }
        };

        if !self.claim(key) {
            debug!("Document already attempted: {}", url);
            return DocumentOutcome::AlreadyAttempted;
        }

        info!("Downloading document: {}", url);

        let mut attempt = 0;
        let transfer = loop {
            attempt += 1;
            match self.transfer(url).await {
                Ok(transfer) => break transfer,
                Err(TransferError::Retryable(error)) if attempt < self.config.max_attempts => {
                    let delay = backoff_delay(self.config.backoff_base_ms, attempt);
                    warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt, self.config.max_attempts, url, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(TransferError::Retryable(error)) | Err(TransferError::Fatal(error)) => {
                    warn!("Failed to download {}: {}", url, error);
                    return DocumentOutcome::Failed {
                        error,
                        attempts: attempt,
                    };
                }
            }
        };

        match transfer {
            Transfer::WrongType(content_type) => {
                warn!(
                    "Rejecting {}: Content-Type '{}' is not {}",
                    url, content_type, self.config.expected_content_type
                );
                DocumentOutcome::ContentMismatch { content_type }
            }
            Transfer::Body { bytes, .. } if bytes.len() < self.config.min_bytes => {
                warn!(
                    "Rejecting {}: {} bytes is below the {} byte minimum",
                    url,
                    bytes.len(),
                    self.config.min_bytes
                );
                DocumentOutcome::TooSmall { size: bytes.len() }
            }
            Transfer::Body {
                bytes,
                content_type,
            } => DocumentOutcome::Fetched {
                bytes,
                content_type,
            },
        }
    }

    /// Performs one streaming GET
    async fn transfer(&self, url: &str) -> Result<Transfer, TransferError> {
        let mut response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransferError::Retryable(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(TransferError::Fatal(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.contains(&self.config.expected_content_type.to_ascii_lowercase()) {
            return Ok(Transfer::WrongType(content_type));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransferError::Retryable(format!("body read failed: {}", e)))?
        {
            bytes.extend_from_slice(&chunk);
        }

        Ok(Transfer::Body {
            bytes,
            content_type,
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransferError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        TransferError::Retryable(e.to_string())
    } else {
        TransferError::Fatal(e.to_string())
    }
}

/// Delay before the attempt following attempt number `attempt` (1-based)
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(1u64 << exponent))
}
