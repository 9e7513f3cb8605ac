//! Canonical rule form.
//!
//! Every stage after the merger speaks a single syntax: one `||domain^`
//! rule per line, with `!` starting a comment line (AdGuard convention).

pub mod domain;

pub use domain::{is_valid_domain, normalize_domain};

/// Prefix of a canonical domain-block rule.
pub const RULE_PREFIX: &str = "||";
/// Suffix of a canonical domain-block rule.
pub const RULE_SUFFIX: &str = "^";

/// Render a domain as a canonical `||domain^` rule.
pub fn render_rule(domain: &str) -> String {
    format!("{}{}{}", RULE_PREFIX, domain, RULE_SUFFIX)
}

/// Extract the domain from a canonical `||domain^` rule.
///
/// Returns `None` for anything that is not exactly a canonical rule.
pub fn rule_domain(line: &str) -> Option<&str> {
    let domain = line
        .trim()
        .strip_prefix(RULE_PREFIX)?
        .strip_suffix(RULE_SUFFIX)?;
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// Whether a line of a rule file is a comment (`!` or `#`) or blank.
pub fn is_comment_or_blank(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('!') || line.starts_with('#')
}
