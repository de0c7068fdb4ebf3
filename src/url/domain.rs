use std::net::IpAddr;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use campus_harvest::url::extract_domain;
///
/// let url = Url::parse("https://Admissions.Example.EDU/apply").unwrap();
/// assert_eq!(extract_domain(&url), Some("admissions.example.edu".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registered domain of a host
///
/// This is the label directly under the public suffix, per the Public Suffix
/// List: `example.edu` for `admissions.example.edu`, `iitb.ac.in` for
/// `www.cse.iitb.ac.in`. IP addresses and hosts with no registrable domain
/// (`localhost`) are returned unchanged.
///
/// # Arguments
///
/// * `host` - A host name, in any case
pub fn registered_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();

    // IPv6 hosts come bracketed from `Url::host_str`
    if host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok() {
        return host;
    }

    match psl::domain(host.as_bytes()) {
        Some(domain) => String::from_utf8_lossy(domain.as_bytes()).into_owned(),
        None => host,
    }
}

/// Returns true when both URLs share a registered domain
///
/// URLs without a host never match.
pub fn same_registered_domain(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => registered_domain(x) == registered_domain(y),
        _ => false,
    }
}
