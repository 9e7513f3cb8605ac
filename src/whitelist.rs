//! Whitelist loading and suffix-exact blacklist filtering.
//!
//! A blacklist rule for domain `D` is removed when a whitelist entry `W`
//! satisfies `D == W` or `D` ends with `"." + W`. Matching walks the parent
//! domains of `D`, so `evilqq.com` is never caught by `qq.com`.

use ahash::AHashSet;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::rule::domain::ancestors;
use crate::rule::{is_comment_or_blank, rule_domain, RULE_PREFIX, RULE_SUFFIX};
use crate::stage::{generated_at, CategoryOutcome, SkipReason, StageReport};
use crate::Result;

/// A set of whitelisted domains.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    /// Lowercase entries without leading dot
    domains: AHashSet<String>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse whitelist text: one domain per line, `#`/`!` comments ignored.
    ///
    /// `*.example.com`, `.example.com` and `||example.com^` are accepted
    /// as `example.com`.
    pub fn parse(content: &str) -> Self {
        let mut whitelist = Self::new();
        for line in content.lines() {
            whitelist.add_line(line);
        }
        whitelist
    }

    /// Load and merge several whitelist files; missing files are ignored.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut whitelist = Self::new();
        for path in paths {
            let path = path.as_ref();
            match fs::read_to_string(path) {
                Ok(content) => {
                    let before = whitelist.len();
                    for line in content.lines() {
                        whitelist.add_line(line);
                    }
                    log::info!(
                        "Loaded {} whitelist domains from {:?}",
                        whitelist.len() - before,
                        path
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("Whitelist {:?} not found", path)
                }
                Err(e) => log::warn!("Failed to read whitelist {:?}: {}", path, e),
            }
        }
        whitelist
    }

    fn add_line(&mut self, line: &str) {
        // Remove comments
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            return;
        }
        self.add(line);
    }

    /// Add a single entry.
    pub fn add(&mut self, entry: &str) {
        let entry = entry.trim();
        let entry = entry
            .strip_prefix(RULE_PREFIX)
            .and_then(|e| e.strip_suffix(RULE_SUFFIX))
            .unwrap_or(entry);
        let entry = entry
            .strip_prefix("*.")
            .or_else(|| entry.strip_prefix('.'))
            .unwrap_or(entry)
            .to_ascii_lowercase();
        if !entry.is_empty() {
            self.domains.insert(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Return the whitelist entry covering `domain`, if any.
    pub fn matches(&self, domain: &str) -> Option<&str> {
        let domain = domain.to_ascii_lowercase();
        let found = ancestors(&domain).find_map(|candidate| {
            self.domains
                .get(candidate)
                .map(|entry| entry.as_str())
        });
        found
    }

    /// Whether `domain` is covered by the whitelist.
    pub fn contains(&self, domain: &str) -> bool {
        self.matches(domain).is_some()
    }
}

/// A blacklist rule removed by the whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedRule {
    pub rule: String,
    pub matched: String,
}

/// Result of filtering a rule list.
#[derive(Debug, Default)]
pub struct FilteredRules {
    /// `!` header lines of the input, minus stats from an earlier pass
    pub header: Vec<String>,
    pub kept: Vec<String>,
    pub removed: Vec<RemovedRule>,
}

/// Header lines written by a whitelist pass.
const STATS_PREFIXES: [&str; 3] = [
    "! Whitelist applied:",
    "! Whitelist domains:",
    "! After whitelist:",
];

fn is_stats_line(line: &str) -> bool {
    STATS_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Split a blacklist into header, kept and removed rules.
///
/// Lines that are not canonical `||domain^` rules are kept untouched.
pub fn filter_rules(content: &str, whitelist: &Whitelist) -> FilteredRules {
    let mut result = FilteredRules::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if is_comment_or_blank(trimmed) {
            // Bare "!" separators and earlier stats are regenerated on write
            if trimmed.len() > 1 && !is_stats_line(trimmed) {
                result.header.push(trimmed.to_string());
            }
            continue;
        }

        let matched = rule_domain(trimmed).and_then(|domain| whitelist.matches(domain));
        match matched {
            Some(entry) => result.removed.push(RemovedRule {
                rule: trimmed.to_string(),
                matched: entry.to_string(),
            }),
            None => result.kept.push(trimmed.to_string()),
        }
    }
    result
}

/// Statistics of a whitelist pass over one category.
#[derive(Debug, Clone, PartialEq)]
pub struct WhitelistStats {
    pub whitelist_size: usize,
    pub original: usize,
    pub kept: usize,
    pub removed: usize,
}

pub type WhitelistReport = StageReport<WhitelistStats>;

/// Apply the whitelist to `filters/<category>-blacklist.txt` in place.
///
/// The filtered list is written to `<category>-blacklist-whitelisted.txt` and
/// renamed over the original. With `audit` set, removed rules are listed in
/// `<category>-whitelisted-removed.txt`.
pub fn filter_category(
    config: &PipelineConfig,
    category: &str,
    whitelist: &Whitelist,
    audit: bool,
) -> Result<CategoryOutcome<WhitelistStats>> {
    let input = config.blacklist_path(category);
    if !input.is_file() {
        log::warn!("Input file not found: {:?}", input);
        return Ok(CategoryOutcome::Skipped(SkipReason::MissingBlacklist));
    }
    if whitelist.is_empty() {
        log::info!("{}: whitelist is empty, nothing to filter", category);
        return Ok(CategoryOutcome::Skipped(SkipReason::EmptyWhitelist));
    }

    let content = fs::read_to_string(&input)?;
    let filtered = filter_rules(&content, whitelist);
    let original = filtered.kept.len() + filtered.removed.len();

    let mut out = String::new();
    for line in &filtered.header {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("! Whitelist applied: {}\n", generated_at()));
    out.push_str(&format!("! Whitelist domains: {}\n", whitelist.len()));
    out.push_str(&format!(
        "! After whitelist: {} rules ({} removed)\n",
        filtered.kept.len(),
        filtered.removed.len()
    ));
    out.push_str("!\n");
    for rule in &filtered.kept {
        out.push_str(rule);
        out.push('\n');
    }

    let staged = config.whitelisted_path(category);
    fs::write(&staged, out)?;
    fs::rename(&staged, &input)?;

    if audit {
        write_audit(&config.removed_path(category), category, &filtered.removed)?;
    }

    log::info!(
        "{}: {} rules after whitelist ({} removed)",
        category,
        filtered.kept.len(),
        filtered.removed.len()
    );

    Ok(CategoryOutcome::Produced(WhitelistStats {
        whitelist_size: whitelist.len(),
        original,
        kept: filtered.kept.len(),
        removed: filtered.removed.len(),
    }))
}

fn write_audit(path: &Path, category: &str, removed: &[RemovedRule]) -> Result<()> {
    let mut out = format!(
        "! Rules removed from {} by whitelist ({})\n! rule\tmatched whitelist entry\n",
        category,
        generated_at()
    );
    for entry in removed {
        out.push_str(&entry.rule);
        out.push('\t');
        out.push_str(&entry.matched);
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

/// Apply global + per-category whitelists to every configured category.
pub fn filter_all(config: &PipelineConfig, audit: bool) -> Result<WhitelistReport> {
    log::info!("Applying whitelist processing...");
    let mut report = WhitelistReport::default();
    for category in &config.categories {
        log::info!("Processing category: {}", category.name);
        let whitelist = Whitelist::load(&config.whitelist_paths(category));
        let outcome = filter_category(config, &category.name, &whitelist, audit)?;
        report.push(&category.name, outcome);
    }
    log::info!(
        "Whitelist processing complete: {}/{} categories filtered",
        report.produced_count(),
        config.categories.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryConfig;
    use tempfile::tempdir;

    #[test]
    fn test_parse_whitelist() {
        let wl = Whitelist::parse(
            "# personal\n\nGitHub.com\n*.apple.com\n.qq.com\n||gstatic.com^\nexample.org # inline\n! adguard comment\n",
        );
        assert_eq!(wl.len(), 5);
        assert!(wl.contains("github.com"));
        assert!(wl.contains("apple.com"));
        assert!(wl.contains("qq.com"));
        assert!(wl.contains("gstatic.com"));
        assert!(wl.contains("example.org"));
    }

    #[test]
    fn test_suffix_exact_matching() {
        let wl = Whitelist::parse("example.com\nqq.com\n");
        assert_eq!(wl.matches("example.com"), Some("example.com"));
        assert_eq!(wl.matches("sub.example.com"), Some("example.com"));
        assert_eq!(wl.matches("a.b.example.com"), Some("example.com"));
        assert_eq!(wl.matches("notexample.com"), None);
        assert_eq!(wl.matches("evilqq.com"), None);
        assert_eq!(wl.matches("qq.com.evil.net"), None);
        assert_eq!(wl.matches("com"), None);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let wl = Whitelist::parse("Example.COM\n");
        assert!(wl.contains("WWW.example.com"));
    }

    #[test]
    fn test_filter_rules() {
        let wl = Whitelist::parse("example.com\n");
        let content = "! Title: ads\n!\n||sub.example.com^\n||notexample.com^\n||example.com^\n||ads.example.com^$important\n";
        let filtered = filter_rules(content, &wl);

        assert_eq!(filtered.header, vec!["! Title: ads"]);
        assert_eq!(filtered.kept, vec!["||notexample.com^", "||ads.example.com^$important"]);
        assert_eq!(
            filtered.removed,
            vec![
                RemovedRule {
                    rule: "||sub.example.com^".to_string(),
                    matched: "example.com".to_string(),
                },
                RemovedRule {
                    rule: "||example.com^".to_string(),
                    matched: "example.com".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_load_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("whitelist.txt");
        fs::write(&present, "a.example\n").unwrap();
        let missing = dir.path().join("nope.txt");

        let wl = Whitelist::load(&[present, missing]);
        assert_eq!(wl.len(), 1);
    }

    fn setup(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default().with_root(root);
        config.categories = vec![
            CategoryConfig::new("ads", &[]),
            CategoryConfig::new("malware", &[]),
        ];
        fs::create_dir_all(&config.filters_dir).unwrap();
        config
    }

    #[test]
    fn test_filter_category_in_place_with_audit() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path());
        fs::write(
            config.blacklist_path("ads"),
            "! Title: ads blacklist\n!\n||cdn.github.com^\n||tracker.example^\n",
        )
        .unwrap();

        let wl = Whitelist::parse("github.com\n");
        let outcome = filter_category(&config, "ads", &wl, true).unwrap();
        assert_eq!(
            outcome,
            CategoryOutcome::Produced(WhitelistStats {
                whitelist_size: 1,
                original: 2,
                kept: 1,
                removed: 1,
            })
        );

        let content = fs::read_to_string(config.blacklist_path("ads")).unwrap();
        assert!(content.starts_with("! Title: ads blacklist\n"));
        assert!(content.ends_with("!\n||tracker.example^\n"));
        assert!(!config.whitelisted_path("ads").exists());

        let audit = fs::read_to_string(config.removed_path("ads")).unwrap();
        assert!(audit.contains("||cdn.github.com^\tgithub.com\n"));
    }

    #[test]
    fn test_filter_category_skips() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path());
        let wl = Whitelist::parse("github.com\n");

        assert_eq!(
            filter_category(&config, "ads", &wl, false).unwrap(),
            CategoryOutcome::Skipped(SkipReason::MissingBlacklist)
        );

        fs::write(config.blacklist_path("ads"), "||a.example^\n").unwrap();
        assert_eq!(
            filter_category(&config, "ads", &Whitelist::new(), false).unwrap(),
            CategoryOutcome::Skipped(SkipReason::EmptyWhitelist)
        );
        assert_eq!(
            fs::read_to_string(config.blacklist_path("ads")).unwrap(),
            "||a.example^\n"
        );
    }

    #[test]
    fn test_filter_all_uses_category_whitelists() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path());
        fs::write(
            config.blacklist_path("malware"),
            "||tracker.example^\n||evil.localhost.example^\n",
        )
        .unwrap();
        fs::write(config.filters_dir.join("malware-whitelist.txt"), "localhost.example\n").unwrap();

        let report = filter_all(&config, false).unwrap();
        assert_eq!(
            report.get("ads"),
            Some(&CategoryOutcome::Skipped(SkipReason::MissingBlacklist))
        );
        assert_eq!(report.get("malware").and_then(|o| o.produced()).map(|s| s.removed), Some(1));
        assert!(!config.removed_path("malware").exists());
    }

    #[test]
    fn test_repeated_passes_keep_one_stats_block() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path());
        fs::write(
            config.blacklist_path("ads"),
            "! Title: ads blacklist\n!\n||cdn.github.com^\n||tracker.example^\n",
        )
        .unwrap();
        fs::write(dir.path().join("whitelist.txt"), "github.com\n").unwrap();

        for _ in 0..3 {
            filter_all(&config, false).unwrap();
        }

        let content = fs::read_to_string(config.blacklist_path("ads")).unwrap();
        for prefix in STATS_PREFIXES {
            assert_eq!(content.lines().filter(|l| l.starts_with(prefix)).count(), 1);
        }
        assert!(content.contains("! After whitelist: 1 rules (0 removed)\n"));
        assert!(content.starts_with("! Title: ads blacklist\n"));
        assert!(content.ends_with("!\n||tracker.example^\n"));
    }

    #[test]
    fn test_load_skips_unreadable_path() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("whitelist.txt");
        fs::write(&present, "a.example\n").unwrap();

        // A directory cannot be read as a whitelist file
        let wl = Whitelist::load(&[dir.path().to_path_buf(), present]);
        assert_eq!(wl.len(), 1);
        assert!(wl.contains("a.example"));
    }
}
