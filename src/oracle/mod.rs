//! Relevance oracle
//!
//! The oracle reads a page's linear text together with the fields known so far
//! and proposes which pages to crawl and which documents to download next.
//!
//! # Components
//!
//! - `RelevanceOracle`: the classifier seam (`HttpOracle` talks to a remote one)
//! - `adapter`: turns a raw oracle response into a filtered `Proposal`
//! - `keyword`: the fallback proposal used when no oracle is configured

mod adapter;
mod http;
mod keyword;

pub use adapter::{parse_response, propose, Proposal};
pub use http::HttpOracle;
pub use keyword::keyword_proposal;

use crate::state::FieldMap;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while consulting the oracle
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle returned HTTP {0}")]
    Status(u16),

    #[error("Oracle still rate limiting after {0} attempts")]
    RateLimited(u32),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// Everything the oracle is told about one page
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest {
    pub institute_name: String,

    /// Registered domain of the seed URL
    pub base_domain: String,

    pub page_url: String,

    /// Linear text of the page
    pub text: String,

    /// Field map accumulated so far, so known values are not re-reported
    pub known_fields: FieldMap,

    /// Fields still empty, nested members as `parent.child`
    pub empty_fields: Vec<String>,
}

/// An external relevance classifier
///
/// Returns the raw response body; interpretation belongs to the adapter.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    async fn classify(&self, request: &OracleRequest) -> Result<String, OracleError>;
}
