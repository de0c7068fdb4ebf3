//! URL handling module for Campus-Harvest
//!
//! This module provides URL normalization for dedup, registered-domain
//! comparison, and the extension and keyword filters applied to discovered links.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, registered_domain, same_registered_domain};
pub use filter::{
    file_name, has_ignored_extension, has_negative_keyword, has_stale_year, is_document_url,
    matched_keyword, DOCUMENT_EXTENSIONS, IGNORED_EXTENSIONS,
};
pub use normalize::{normalize, normalize_parsed, NormalizedUrl};

use ::url::Url;

/// Resolves a link href against a base URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is dropped.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute)
}
