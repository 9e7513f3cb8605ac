//! AdGuard / Adblock Plus domain-rule parser.
//!
//! Only network-level domain blocks are understood:
//!
//! ```text
//! [Adblock Plus 2.0]
//! ! comment
//! ||ads.example.com^
//! ||ads.example.com^$third-party
//! ||tracker.example.com$important
//! ```
//!
//! Exception rules (`@@`), cosmetic rules (`##`), regex rules and anything
//! with a path or wildcard are ignored.

use std::collections::BTreeSet;

use crate::rule::{normalize_domain, RULE_PREFIX};

/// AdGuard domain-rule parser.
pub struct AdblockParser;

impl AdblockParser {
    /// Parse every `||domain^` style rule into normalized domains.
    pub fn parse(content: &str) -> BTreeSet<String> {
        content
            .lines()
            .filter_map(Self::parse_line)
            .collect()
    }

    /// Whether a line looks like an adblock domain rule (`||...^` or `||...$`).
    pub fn is_rule(line: &str) -> bool {
        let line = line.trim();
        line.starts_with(RULE_PREFIX) && (line.contains('^') || line.contains('$'))
    }

    /// Parse a single line into a domain.
    pub fn parse_line(line: &str) -> Option<String> {
        let body = line.trim().strip_prefix(RULE_PREFIX)?;

        let end = body.find(|c: char| c == '^' || c == '$')?;
        let (candidate, rest) = body.split_at(end);

        // After the separator only modifiers or the end-of-address anchor may follow
        let valid_tail = match rest.strip_prefix('^') {
            Some(after) => after.is_empty() || after == "|" || after.starts_with('$'),
            None => true, // `||domain$modifiers`
        };
        if !valid_tail {
            return None;
        }

        normalize_domain(candidate)
    }
}
