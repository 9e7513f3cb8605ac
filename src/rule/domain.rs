//! Domain normalization and validation.

use once_cell::sync::Lazy;
use regex::Regex;

/// Permissive hostname pattern: lowercase labels of `[a-z0-9_-]` joined by
/// dots, with at least one internal dot and no leading/trailing dot.
static DOMAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-][a-z0-9_.-]*\.[a-z0-9_.-]*[a-z0-9_-]$").unwrap());

/// Check whether an already-lowercased string is an acceptable domain.
///
/// # Example
/// ```
/// use rulebundle::rule::domain::is_valid_domain;
///
/// assert!(is_valid_domain("ads.example.com"));
/// assert!(is_valid_domain("under_score.example"));
/// assert!(!is_valid_domain("localhost"));
/// assert!(!is_valid_domain("example.com/path"));
/// ```
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_PATTERN.is_match(domain)
}

/// Lowercase and validate a candidate domain.
///
/// Returns `None` when the candidate is rejected.
pub fn normalize_domain(candidate: &str) -> Option<String> {
    let domain = candidate.trim().to_ascii_lowercase();
    if is_valid_domain(&domain) {
        Some(domain)
    } else {
        None
    }
}

/// Iterate over a domain and all of its parent domains.
///
/// `a.b.example.com` yields `a.b.example.com`, `b.example.com`,
/// `example.com` and `com`.
pub fn ancestors(domain: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(domain);
    std::iter::from_fn(move || {
        let this = current?;
        current = this.find('.').map(|pos| &this[pos + 1..]).filter(|s| !s.is_empty());
        Some(this)
    })
}
