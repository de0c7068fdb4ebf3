use crate::UrlError;
use std::fmt;
use url::Url;

/// Canonical identity of a crawl target
///
/// Built from the lowercase host (leading `www.` removed, port kept) followed by
/// the path with a single trailing `/` removed. Scheme, query string and
/// fragment are deliberately left out, so `http://www.example.edu/fees/` and
/// `https://example.edu/fees?tab=2` are the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a URL string into its dedup key
///
/// # Arguments
///
/// * `url_str` - An absolute http or https URL
///
/// # Returns
///
/// * `Ok(NormalizedUrl)` - The dedup key
/// * `Err(UrlError)` - The URL could not be parsed, is not http(s), or has no host
///
/// # Examples
///
/// ```
/// use campus_harvest::url::normalize;
///
/// let a = normalize("http://WWW.Example.edu/fees/").unwrap();
/// let b = normalize("https://example.edu/fees").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "example.edu/fees");
/// ```
pub fn normalize(url_str: &str) -> Result<NormalizedUrl, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&url)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(url: &Url) -> Result<NormalizedUrl, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let path = url.path();
    let path = path.strip_suffix('/').unwrap_or(path);

    let key = match url.port() {
        Some(port) => format!("{}:{}{}", host, port, path),
        None => format!("{}{}", host, path),
    };

    Ok(NormalizedUrl(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> String {
        normalize(url).unwrap().to_string()
    }

    #[test]
    fn test_scheme_is_ignored() {
        assert_eq!(key("http://example.edu/fees"), key("https://example.edu/fees"));
    }

    #[test]
    fn test_www_prefix_is_ignored() {
        assert_eq!(key("https://www.example.edu/fees"), key("https://example.edu/fees"));
    }

    #[test]
    fn test_single_trailing_slash_is_ignored() {
        assert_eq!(key("https://example.edu/fees/"), key("https://example.edu/fees"));
        assert_eq!(key("https://example.edu/"), key("https://example.edu"));
        assert_eq!(key("https://example.edu"), "example.edu");
    }

    #[test]
    fn test_only_one_trailing_slash_removed() {
        assert_eq!(key("https://example.edu/fees//"), "example.edu/fees/");
    }

    #[test]
    fn test_all_variations_combined() {
        let expected = "example.edu/admissions";
        assert_eq!(key("http://WWW.EXAMPLE.EDU/admissions/"), expected);
        assert_eq!(key("https://example.edu/admissions"), expected);
        assert_eq!(key("https://www.example.edu/admissions/"), expected);
    }

    #[test]
    fn test_query_and_fragment_are_not_part_of_key() {
        assert_eq!(key("https://example.edu/page?id=1"), "example.edu/page");
        assert_eq!(key("https://example.edu/page#top"), "example.edu/page");
        assert_eq!(
            key("https://example.edu/page?id=1"),
            key("https://example.edu/page?id=2")
        );
    }

    #[test]
    fn test_path_case_is_preserved() {
        assert_ne!(key("https://example.edu/Fees"), key("https://example.edu/fees"));
    }

    #[test]
    fn test_port_is_kept() {
        assert_eq!(key("http://127.0.0.1:8080/a/"), "127.0.0.1:8080/a");
        assert_ne!(key("http://127.0.0.1:8080/a"), key("http://127.0.0.1:9090/a"));
    }

    #[test]
    fn test_www_only_stripped_as_prefix() {
        assert_eq!(key("https://mywww.example.edu/"), "mywww.example.edu");
    }

    #[test]
    fn test_invalid_scheme() {
        assert!(matches!(
            normalize("ftp://example.edu/file"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            normalize("mailto:office@example.edu"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_unparseable_url() {
        assert!(matches!(normalize("not a url"), Err(UrlError::Parse(_))));
        assert!(matches!(normalize("/relative/path"), Err(UrlError::Parse(_))));
    }
}
