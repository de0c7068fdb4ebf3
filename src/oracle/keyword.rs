//! Keyword fallback proposal
//!
//! Used when no oracle is configured. Pages are proposed from same-domain
//! links whose text or path mentions a relevance keyword; documents from
//! document links on a relevant page or with a relevant file name.

use super::Proposal;
use crate::crawler::ProcessedPage;
use crate::url::{
    file_name, has_ignored_extension, has_negative_keyword, has_stale_year, is_document_url,
    matched_keyword, same_registered_domain,
};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Builds the proposal for a processed page without consulting an oracle
///
/// # Page links
///
/// Kept when the link is on the seed's registered domain, has no ignored or
/// document extension, its text or path matches a keyword, and neither
/// mentions a negative keyword.
///
/// # Document links
///
/// Kept when the page title or text, or the document's file name, matches a
/// keyword; the file name and URL carry no negative keyword; and the file name
/// carries no 2000-2019 year stamp.
pub fn keyword_proposal(page: &ProcessedPage, seed_url: &Url) -> Proposal {
    let page_is_relevant =
        matched_keyword(&page.title).is_some() || matched_keyword(&page.visible_text).is_some();

    let mut proposal = Proposal::default();
    let mut seen = HashSet::new();

    for link in &page.links {
        if !seen.insert(link.url.as_str()) {
            continue;
        }

        if is_document_url(&link.url) {
            if is_relevant_document(&link.url, page_is_relevant) {
                proposal.new_document_urls.push(link.url.clone());
            }
            continue;
        }

        if !same_registered_domain(&link.url, seed_url) {
            debug!("Skipping external link: {}", link.url);
            continue;
        }

        if has_ignored_extension(&link.url) {
            continue;
        }

        let path = link.url.path();
        let relevant = matched_keyword(&link.text).or_else(|| matched_keyword(path));
        let negative = has_negative_keyword(&link.text) || has_negative_keyword(path);

        match relevant {
            Some(keyword) if !negative => {
                debug!("Following {} (matched '{}')", link.url, keyword);
                proposal.new_page_urls.push(link.url.clone());
            }
            _ => debug!("Skipping irrelevant link: {}", link.url),
        }
    }

    proposal
}

fn is_relevant_document(url: &Url, page_is_relevant: bool) -> bool {
    let name = file_name(url);

    if has_negative_keyword(&name) || has_negative_keyword(url.as_str()) {
        debug!("Skipping document with negative keyword: {}", url);
        return false;
    }

    if has_stale_year(&name) {
        debug!("Skipping stale document: {}", url);
        return false;
    }

    page_is_relevant || matched_keyword(&name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::process;

    fn seed_url() -> Url {
        Url::parse("https://example.edu").unwrap()
    }

    fn urls(list: &[Url]) -> Vec<&str> {
        list.iter().map(Url::as_str).collect()
    }

    #[test]
    fn test_seed_page_links() {
        let html = r#"<html><head><title>Example University</title></head><body>
            <a href="/fees">Fees</a>
            <a href="https://external.org/ad">Admissions partner</a>
            <a href="https://example.edu/brochure.pdf">Brochure</a>
        </body></html>"#;
        let page = process(html, &seed_url());
        let proposal = keyword_proposal(&page, &seed_url());

        assert_eq!(urls(&proposal.new_page_urls), vec!["https://example.edu/fees"]);
        assert_eq!(
            urls(&proposal.new_document_urls),
            vec!["https://example.edu/brochure.pdf"]
        );
        assert!(proposal.updated_fields.is_empty());
    }

    #[test]
    fn test_page_link_filters() {
        let html = r#"<title>Home</title>
            <a href="/gallery">Photo gallery</a>
            <a href="/events/tech-fest-admission">Admission fest</a>
            <a href="/tenders/fee-notice">Fee tender</a>
            <a href="/images/fees.png">Fee chart</a>
            <a href="https://cse.example.edu/syllabus">Syllabus</a>
            <a href="/about">Programmes offered</a>"#;
        let page = process(html, &seed_url());
        let proposal = keyword_proposal(&page, &seed_url());

        assert_eq!(
            urls(&proposal.new_page_urls),
            vec!["https://cse.example.edu/syllabus", "https://example.edu/about"]
        );
    }

    #[test]
    fn test_documents_on_irrelevant_page_need_relevant_name() {
        let html = r#"<title>Gallery</title><p>Photos from campus</p>
            <a href="/docs/photos.pdf">Photos</a>
            <a href="/docs/prospectus.pdf">Download</a>"#;
        let page = process(html, &seed_url());
        let proposal = keyword_proposal(&page, &seed_url());

        assert_eq!(
            urls(&proposal.new_document_urls),
            vec!["https://example.edu/docs/prospectus.pdf"]
        );
    }

    #[test]
    fn test_document_filters() {
        let html = r#"<title>Admissions</title>
            <a href="/docs/prospectus_2015.pdf">Old prospectus</a>
            <a href="/docs/tender-notice.pdf">Notice</a>
            <a href="/fest/schedule.pdf">Schedule</a>
            <iframe src="/docs/fee-structure.pdf"></iframe>"#;
        let page = process(html, &seed_url());
        let proposal = keyword_proposal(&page, &seed_url());

        assert_eq!(
            urls(&proposal.new_document_urls),
            vec!["https://example.edu/docs/fee-structure.pdf"]
        );
    }
}
