//! Oracle response adapter
//!
//! Validates and defaults the loosely-typed JSON an oracle returns. A response
//! that cannot be interpreted becomes the empty proposal; it never aborts the
//! crawl.

use super::{OracleRequest, RelevanceOracle};
use crate::state::FieldMap;
use crate::url::{has_ignored_extension, is_document_url, resolve_link, same_registered_domain};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

const PAGE_KEYS: &[&str] = &["new_urls", "new_page_urls"];
const DOCUMENT_KEYS: &[&str] = &["new_pdfs", "new_document_urls"];
const METADATA_KEY: &str = "metadata";
const FIELDS_KEY: &str = "updated_fields";

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*|\s*```").unwrap());

/// Frontier and field updates proposed for one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Proposal {
    /// Pages to crawl; same registered domain as the seed, never documents
    pub new_page_urls: Vec<Url>,

    /// Documents to download
    pub new_document_urls: Vec<Url>,

    /// Field values to merge into the crawl state
    pub updated_fields: FieldMap,

    /// Tags attached to the page record
    pub metadata: Option<Value>,
}

#[cfg(test)]
impl Proposal {
    pub fn is_empty(&self) -> bool {
        self.new_page_urls.is_empty()
            && self.new_document_urls.is_empty()
            && self.updated_fields.is_empty()
            && self.metadata.is_none()
    }
}

/// Consults the oracle for one page
///
/// Oracle failures are logged and yield the empty proposal.
pub async fn propose(
    oracle: &dyn RelevanceOracle,
    request: &OracleRequest,
    page_url: &Url,
    seed_url: &Url,
) -> Proposal {
    match oracle.classify(request).await {
        Ok(raw) => parse_response(&raw, page_url, seed_url),
        Err(e) => {
            warn!("Oracle failed for {}: {}", page_url, e);
            Proposal::default()
        }
    }
}

/// Interprets a raw oracle response
///
/// - Markdown code fences around the JSON are stripped
/// - `new_urls` / `new_page_urls` and `new_pdfs` / `new_document_urls` are
///   accepted; relative entries resolve against `page_url`
/// - A document-typed URL among the pages is moved to the documents; a
///   non-document URL among the documents is dropped
/// - Pages off the seed's registered domain or with an ignored extension are
///   dropped
/// - `metadata` is attached to the page record; members of `updated_fields`
///   and every other top-level key become field updates
pub fn parse_response(raw: &str, page_url: &Url, seed_url: &Url) -> Proposal {
    let cleaned = CODE_FENCE.replace_all(raw, "");
    let cleaned = cleaned.trim();

    let mut object = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            warn!(
                "Oracle response for {} is not an object: {}",
                page_url,
                type_name(&other)
            );
            return Proposal::default();
        }
        Err(e) => {
            warn!("Oracle response for {} is not valid JSON: {}", page_url, e);
            return Proposal::default();
        }
    };

    let mut proposal = Proposal::default();
    let mut seen_pages = HashSet::new();
    let mut seen_documents = HashSet::new();

    for key in PAGE_KEYS {
        for candidate in url_list(object.remove(*key), page_url) {
            if is_document_url(&candidate) {
                if seen_documents.insert(candidate.to_string()) {
                    proposal.new_document_urls.push(candidate);
                }
            } else if !same_registered_domain(&candidate, seed_url) {
                debug!("Dropping off-domain proposal: {}", candidate);
            } else if has_ignored_extension(&candidate) {
                debug!("Dropping ignored-extension proposal: {}", candidate);
            } else if seen_pages.insert(candidate.to_string()) {
                proposal.new_page_urls.push(candidate);
            }
        }
    }

    for key in DOCUMENT_KEYS {
        for candidate in url_list(object.remove(*key), page_url) {
            if !is_document_url(&candidate) {
                debug!("Dropping non-document proposal: {}", candidate);
            } else if seen_documents.insert(candidate.to_string()) {
                proposal.new_document_urls.push(candidate);
            }
        }
    }

    proposal.metadata = object.remove(METADATA_KEY).filter(|v| !v.is_null());

    let explicit = object.remove(FIELDS_KEY);
    proposal.updated_fields = object;
    match explicit {
        Some(Value::Object(fields)) => proposal.updated_fields.extend(fields),
        Some(Value::Null) | None => {}
        Some(other) => warn!(
            "Ignoring updated_fields of type {} from oracle",
            type_name(&other)
        ),
    }

    proposal
}

/// Reads a list of URL strings, resolving each against `base`
fn url_list(value: Option<Value>, base: &Url) -> Vec<Url> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|s| resolve_link(s, base))
            .collect(),
        Some(Value::String(single)) => resolve_link(&single, base).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
