//! Final bundle: cross-category concatenation with first-seen dedup.

use ahash::AHashSet;
use sha2::{Digest, Sha256};
use std::fs;

use crate::config::PipelineConfig;
use crate::rule::is_comment_or_blank;
use crate::stage::generated_at;
use crate::{Error, Result};

/// Rules read from one category file.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRules {
    pub category: String,
    /// `None` when the category file was missing
    pub rules: Option<Vec<String>>,
}

/// Provenance statistics of a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleStats {
    pub categories: usize,
    /// Rules contributed per category, before dedup
    pub per_category: Vec<(String, usize)>,
    /// Categories whose file was missing
    pub missing: Vec<String>,
    pub total_before_dedup: usize,
    pub unique: usize,
    pub duplicates_removed: usize,
}

/// Concatenate category rule lists keeping the first occurrence of each rule.
///
/// # Example
/// ```
/// use rulebundle::combiner::{combine_rules, CategoryRules};
///
/// let lists = vec![
///     CategoryRules { category: "ads".into(), rules: Some(vec!["a".into(), "b".into()]) },
///     CategoryRules { category: "malware".into(), rules: Some(vec!["b".into(), "c".into()]) },
/// ];
/// let (rules, stats) = combine_rules(&lists);
/// assert_eq!(rules, vec!["a", "b", "c"]);
/// assert_eq!(stats.duplicates_removed, 1);
/// ```
pub fn combine_rules(lists: &[CategoryRules]) -> (Vec<String>, BundleStats) {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut unique = Vec::new();
    let mut per_category = Vec::with_capacity(lists.len());
    let mut missing = Vec::new();
    let mut total = 0;

    for list in lists {
        let rules = match &list.rules {
            Some(rules) => rules,
            None => {
                missing.push(list.category.clone());
                per_category.push((list.category.clone(), 0));
                continue;
            }
        };
        per_category.push((list.category.clone(), rules.len()));
        total += rules.len();
        for rule in rules {
            if seen.insert(rule.as_str()) {
                unique.push(rule.clone());
            }
        }
    }

    let stats = BundleStats {
        categories: lists.len(),
        per_category,
        missing,
        total_before_dedup: total,
        unique: unique.len(),
        duplicates_removed: total - unique.len(),
    };
    (unique, stats)
}

/// Read the rule lines of each category blacklist (comments and blanks dropped).
///
/// A missing or unreadable file is logged and contributes no rules.
pub fn read_category_rules(config: &PipelineConfig) -> Vec<CategoryRules> {
    config
        .categories
        .iter()
        .map(|category| {
            let path = config.blacklist_path(&category.name);
            let rules = match fs::read_to_string(&path) {
                Ok(content) => {
                    let rules: Vec<String> = content
                        .lines()
                        .filter(|line| !is_comment_or_blank(line))
                        .map(|line| line.trim().to_string())
                        .collect();
                    log::info!("  {}: {} rules", category.name, rules.len());
                    Some(rules)
                }
                Err(e) => {
                    log::warn!("  {}: {:?} not available ({})", category.name, path, e);
                    None
                }
            };
            CategoryRules {
                category: category.name.clone(),
                rules,
            }
        })
        .collect()
}

/// Render the bundle: `!` header block followed by one rule per line.
pub fn render_bundle(config: &PipelineConfig, rules: &[String], stats: &BundleStats) -> String {
    let mut body = String::new();
    for rule in rules {
        body.push_str(rule);
        body.push('\n');
    }
    let checksum = format!("{:x}", Sha256::digest(body.as_bytes()));

    let coverage: Vec<String> = config.categories.iter().map(|c| c.display_name()).collect();

    let mut header = vec![
        config.bundle.title.clone(),
        "=================================".to_string(),
        format!("Generated: {}", generated_at()),
        format!("Total categories: {}", stats.categories),
    ];
    for (category, count) in &stats.per_category {
        header.push(format!("  {}: {} rules", category, count));
    }
    header.push(format!("Total rules (before dedup): {}", stats.total_before_dedup));
    header.push(format!("Total unique rules: {}", stats.unique));
    header.push(format!("Duplicates removed: {}", stats.duplicates_removed));
    header.push(String::new());
    header.push(format!("Coverage: {}", coverage.join(" + ")));
    header.extend(config.bundle.description.iter().cloned());
    header.push(format!("SHA-256: {}", checksum));
    header.push("=================================".to_string());

    let mut out = String::new();
    for line in header {
        if line.is_empty() {
            out.push_str("!\n");
        } else {
            out.push_str("! ");
            out.push_str(&line);
            out.push('\n');
        }
    }
    out.push('\n');
    out.push_str(&body);
    out
}

/// Combine every category blacklist into the bundle file.
///
/// Missing categories degrade the bundle. Having no rule at all, or failing
/// to create the output directory or write the file, is an error; an
/// existing bundle is not overwritten with an empty one.
pub fn combine(config: &PipelineConfig) -> Result<BundleStats> {
    log::info!("Combining all rules...");
    let lists = read_category_rules(config);
    let (rules, stats) = combine_rules(&lists);
    if rules.is_empty() {
        log::error!("No rules found in any category");
        return Err(Error::NothingProduced("combine"));
    }

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            log::info!("Created directory: {:?}", parent);
        }
    }

    fs::write(&config.output, render_bundle(config, &rules, &stats))?;
    log::info!("Final bundle: {} rules saved to {:?}", stats.unique, config.output);
    Ok(stats)
}
