//! Source list format detection and domain extraction.
//!
//! Upstream lists arrive either as hosts files or as AdGuard filter lists
//! (and occasionally as a mix of both). [`detect_format`] sniffs a prefix of
//! the content; [`extract_domains`] runs the matching extractor(s).

mod adblock;
mod hosts;

use std::collections::BTreeSet;
use std::fmt;

pub use adblock::AdblockParser;
pub use hosts::{HostsParser, NULL_ADDRESSES};

/// Default number of leading bytes inspected by [`detect_format`].
pub const DEFAULT_DETECT_PREFIX: usize = 4096;

/// Detected syntax of a source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// `0.0.0.0 domain` / `127.0.0.1 domain` lines
    Hosts,
    /// `||domain^` lines
    Adblock,
    /// Both signals present
    Mixed,
    /// Neither signal present in the inspected prefix
    Unknown,
}

impl SourceFormat {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Hosts => "hosts",
            SourceFormat::Adblock => "adblock",
            SourceFormat::Mixed => "mixed",
            SourceFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify the syntax of a source list by looking at its first
/// `prefix_bytes` bytes.
///
/// # Example
/// ```
/// use rulebundle::converter::{detect_format, SourceFormat};
///
/// assert_eq!(detect_format("0.0.0.0 ads.example\n", 4096), SourceFormat::Hosts);
/// assert_eq!(detect_format("||ads.example^\n", 4096), SourceFormat::Adblock);
/// ```
pub fn detect_format(content: &str, prefix_bytes: usize) -> SourceFormat {
    let prefix = truncate_at_char_boundary(content, prefix_bytes);

    let mut adblock_signals = 0usize;
    let mut hosts_signals = 0usize;

    for line in prefix.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') || line.starts_with('#') {
            continue;
        }
        if AdblockParser::is_rule(line) {
            adblock_signals += 1;
        } else if HostsParser::is_entry(line) {
            hosts_signals += 1;
        }
    }

    match (adblock_signals > 0, hosts_signals > 0) {
        (true, false) => SourceFormat::Adblock,
        (false, true) => SourceFormat::Hosts,
        (true, true) => SourceFormat::Mixed,
        (false, false) => SourceFormat::Unknown,
    }
}

/// Extract normalized domains from a source list of the given format.
///
/// `Mixed` and `Unknown` run both extractors and union the results.
pub fn extract_domains(content: &str, format: SourceFormat) -> BTreeSet<String> {
    match format {
        SourceFormat::Hosts => HostsParser::parse(content),
        SourceFormat::Adblock => AdblockParser::parse(content),
        SourceFormat::Mixed | SourceFormat::Unknown => {
            let mut domains = HostsParser::parse(content);
            domains.extend(AdblockParser::parse(content));
            domains
        }
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
