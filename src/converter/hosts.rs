//! Hosts-file format parser.
//!
//! ```text
//! # comment
//! 0.0.0.0 ads.example.com
//! 127.0.0.1 tracker.example.com tracker2.example.com  # inline comment
//! ```

use std::collections::BTreeSet;

use crate::rule::normalize_domain;

/// Addresses that mark a hosts line as a block entry.
pub const NULL_ADDRESSES: &[&str] = &["0.0.0.0", "127.0.0.1"];

/// Hosts-file format parser.
pub struct HostsParser;

impl HostsParser {
    /// Parse every block entry of a hosts file into normalized domains.
    pub fn parse(content: &str) -> BTreeSet<String> {
        let mut domains = BTreeSet::new();
        for line in content.lines() {
            Self::parse_line(line, &mut domains);
        }
        domains
    }

    /// Whether a line is a hosts-style block entry.
    pub fn is_entry(line: &str) -> bool {
        line.split_whitespace()
            .next()
            .map(|first| NULL_ADDRESSES.contains(&first))
            .unwrap_or(false)
    }

    fn parse_line(line: &str, domains: &mut BTreeSet<String>) {
        // Remove comments
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some(address) if NULL_ADDRESSES.contains(&address) => {}
            _ => return,
        }

        // A hosts line may map several names to the same address
        for token in tokens.filter(|t| !NULL_ADDRESSES.contains(t)) {
            if let Some(domain) = normalize_domain(token) {
                domains.insert(domain);
            }
        }
    }
}
