//! Extension and keyword filters for discovered links

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Extensions acquired as binary documents rather than crawled as pages
pub const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf"];

/// Extensions never worth fetching as a page
pub const IGNORED_EXTENSIONS: &[&str] = &[
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".tif", ".tiff", ".ico", ".webp",
    ".heif", ".heic", ".raw", ".psd", ".indd", ".ai", ".eps",
    // video
    ".mp4", ".m4a", ".mov", ".avi", ".wmv", ".flv", ".mkv", ".mpeg", ".mpg", ".webm",
    ".vob", ".ogv", ".m4v", ".3gp", ".3g2", ".f4v", ".f4p", ".f4a", ".f4b",
    // audio
    ".mp3", ".wav", ".aac", ".ogg", ".wma", ".flac", ".alac", ".aiff", ".au", ".m4b",
    ".m4p", ".mp2", ".mpa", ".amr", ".pcm", ".mid", ".midi", ".oga", ".opus",
    // executables and scripts
    ".exe", ".bat", ".cmd", ".sh", ".bin", ".app", ".vb", ".vbs", ".jar", ".py", ".pl",
    ".rb", ".swf", ".gadget", ".msi", ".scr", ".htaccess", ".dll", ".so", ".dylib",
    ".apk", ".pif", ".wsf",
    // archives
    ".rar", ".zip", ".7z", ".7zip", ".tar", ".sit", ".arc", ".arj", ".bz2", ".cab",
    ".gz", ".iso", ".lha", ".lzh",
    // office documents
    ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".odt", ".ods", ".odp", ".rtf",
    ".txt", ".ppsx",
];

/// Topics an admissions or course page is expected to mention
const KEYWORDS: &[&str] = &[
    "brochure",
    "mandatory disclosure",
    "accreditation",
    "ranking",
    "iqac",
    "aqar",
    "nirf",
    "course",
    "class",
    "curriculum",
    "syllabus",
    "programme",
    "program",
    "fees",
    "tuition",
    "financial",
    "cost",
    "placement",
    "career",
    "internship",
    "employment",
    "job opportunities",
    "prospectus",
    "disclosure",
    "admission",
    "eligibility",
    "scholarship",
    "fee structure",
    "fee",
];

const NEGATIVE_KEYWORDS: &[&str] = &["tender", "fest"];

static KEYWORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i)({})", KEYWORDS.join("|"))).unwrap());

static NEGATIVE_KEYWORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i)({})", NEGATIVE_KEYWORDS.join("|"))).unwrap());

// Years 2000 through 2019
static STALE_YEAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"20(00|0[1-9]|1[0-9])").unwrap());

/// Returns true if the URL path ends in a document extension
pub fn is_document_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Returns true if the URL path ends in an extension that is never crawled
pub fn has_ignored_extension(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    IGNORED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Returns the first relevance keyword found in `text`, if any
pub fn matched_keyword(text: &str) -> Option<&str> {
    KEYWORD_REGEX.find(text).map(|m| m.as_str())
}

/// Returns true if `text` contains a negative keyword
pub fn has_negative_keyword(text: &str) -> bool {
    NEGATIVE_KEYWORD_REGEX.is_match(text)
}

/// Returns true if `text` carries a 2000-2019 year stamp
pub fn has_stale_year(text: &str) -> bool {
    STALE_YEAR_REGEX.is_match(text)
}

/// Returns the last non-empty path segment of a URL, still percent-encoded
///
/// Falls back to the host for URLs whose path is empty or `/`.
pub fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .or_else(|| url.host_str().map(|h| h.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_document_extension_case_insensitive() {
        assert!(is_document_url(&url("https://example.edu/brochure.pdf")));
        assert!(is_document_url(&url("https://example.edu/Brochure.PDF")));
        assert!(is_document_url(&url("https://example.edu/brochure.pdf?v=2")));
        assert!(!is_document_url(&url("https://example.edu/pdf/index")));
    }

    #[test]
    fn test_ignored_extensions() {
        assert!(has_ignored_extension(&url("https://example.edu/logo.PNG")));
        assert!(has_ignored_extension(&url("https://example.edu/forms/apply.docx")));
        assert!(!has_ignored_extension(&url("https://example.edu/fees")));
        assert!(!has_ignored_extension(&url("https://example.edu/brochure.pdf")));
    }

    #[test]
    fn test_keyword_match() {
        assert_eq!(matched_keyword("Fee Structure 2024"), Some("Fee Structure"));
        assert_eq!(matched_keyword("Hostel fee"), Some("fee"));
        assert_eq!(matched_keyword("/admissions/apply"), Some("admission"));
        assert!(matched_keyword("Campus gallery").is_none());
    }

    #[test]
    fn test_negative_keyword() {
        assert!(has_negative_keyword("annual-fest-brochure.pdf"));
        assert!(has_negative_keyword("TENDER notice"));
        assert!(!has_negative_keyword("brochure.pdf"));
    }

    #[test]
    fn test_stale_year() {
        assert!(has_stale_year("prospectus_2015.pdf"));
        assert!(has_stale_year("fees-2000"));
        assert!(!has_stale_year("prospectus_2024.pdf"));
        assert!(!has_stale_year("brochure.pdf"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(&url("https://example.edu/docs/Brochure.pdf")), "Brochure.pdf");
        assert_eq!(file_name(&url("https://example.edu/fees/")), "fees");
        assert_eq!(file_name(&url("https://example.edu/")), "example.edu");
    }
}
