//! Per-category merge of raw source lists into a canonical blacklist.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::converter::{detect_format, extract_domains, SourceFormat};
use crate::manifest::FetchManifest;
use crate::rule::render_rule;
use crate::stage::{generated_at, CategoryOutcome, SkipReason, StageReport};
use crate::Result;

/// One source file that contributed to a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFileStats {
    pub file: String,
    pub format: SourceFormat,
    pub domains: usize,
}

/// Domains collected from a category source directory.
#[derive(Debug, Default)]
pub struct CollectedDomains {
    pub domains: BTreeSet<String>,
    pub files: Vec<SourceFileStats>,
    /// Files that could not be read
    pub failed: Vec<String>,
}

/// Statistics of a produced category blacklist.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStats {
    pub files: Vec<SourceFileStats>,
    pub failed_files: usize,
    pub rules: usize,
}

pub type MergeReport = StageReport<MergeStats>;

/// Read every `*.txt` file in `dir` (sorted by name) and union their domains.
///
/// Unreadable files are logged and skipped. Fails only if the directory
/// itself cannot be listed.
pub fn collect_domains(dir: &Path, detect_prefix_bytes: usize) -> std::io::Result<CollectedDomains> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map(|ext| ext == "txt").unwrap_or(false))
        .collect();
    paths.sort();

    let mut collected = CollectedDomains::default();

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Error reading {}: {}", name, e);
                collected.failed.push(name);
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);

        let format = detect_format(&content, detect_prefix_bytes);
        let domains = extract_domains(&content, format);
        log::info!("  {}: {} format, {} domains", name, format, domains.len());

        collected.files.push(SourceFileStats {
            file: name,
            format,
            domains: domains.len(),
        });
        collected.domains.extend(domains);
    }

    Ok(collected)
}

/// Render a canonical blacklist: `!` header lines, then sorted `||domain^` rules.
pub fn render_blacklist<'a>(
    header: &[String],
    domains: impl IntoIterator<Item = &'a String>,
) -> String {
    let mut out = String::new();
    for line in header {
        let _ = writeln!(out, "! {}", line);
    }
    out.push_str("!\n");
    for domain in domains {
        out.push_str(&render_rule(domain));
        out.push('\n');
    }
    out
}

/// Merge one category's sources into `filters/<category>-blacklist.txt`.
///
/// Missing/empty sources yield `Skipped`; an existing blacklist from a
/// previous run is then left untouched. Write failures are errors.
pub fn merge_category(config: &PipelineConfig, category: &str) -> Result<CategoryOutcome<MergeStats>> {
    log::info!("Merging {} rules...", category);
    let source_dir = config.source_dir(category);

    if !source_dir.is_dir() {
        log::warn!("No sources for {} ({:?} not found)", category, source_dir);
        return Ok(CategoryOutcome::Skipped(SkipReason::MissingSourceDir));
    }

    let collected = collect_domains(&source_dir, config.merge.detect_prefix_bytes)?;
    if collected.files.is_empty() {
        log::warn!("No readable source files for {} in {:?}", category, source_dir);
        return Ok(CategoryOutcome::Skipped(SkipReason::NoSourceFiles));
    }
    if collected.domains.is_empty() {
        log::warn!("No valid rules extracted for {}, category not produced", category);
        return Ok(CategoryOutcome::Skipped(SkipReason::NoRules));
    }

    let mut header = vec![
        format!("Title: {} blacklist", category),
        format!("Category: {}", category),
        format!("Generated: {}", generated_at()),
        format!("Source files: {}", collected.files.len()),
        format!("Unique rules: {}", collected.domains.len()),
    ];
    if let Some(manifest) = FetchManifest::load(&source_dir) {
        for file in &collected.files {
            if let Some(url) = manifest.url_for(&file.file) {
                header.push(format!("Source: {}", url));
            }
        }
    }

    fs::create_dir_all(&config.filters_dir)?;
    let output = config.blacklist_path(category);
    fs::write(&output, render_blacklist(&header, &collected.domains))?;
    log::info!("{}: {} unique rules saved to {:?}", category, collected.domains.len(), output);

    Ok(CategoryOutcome::Produced(MergeStats {
        rules: collected.domains.len(),
        failed_files: collected.failed.len(),
        files: collected.files,
    }))
}

/// Merge every configured category.
pub fn merge_all(config: &PipelineConfig) -> Result<MergeReport> {
    log::info!("Starting rule merging process...");
    let mut report = MergeReport::default();
    for category in &config.categories {
        let outcome = merge_category(config, &category.name)?;
        report.push(&category.name, outcome);
    }
    log::info!(
        "Merging complete: {}/{} categories processed",
        report.produced_count(),
        config.categories.len()
    );
    Ok(report)
}
