//! rulebundle - a personal DNS/adblock filter-list pipeline.
//!
//! This crate downloads upstream blocklists per category, normalizes them
//! into canonical AdGuard `||domain^` rules, deduplicates, removes
//! whitelisted domains and bundles everything into one rule file.
//!
//! # Stages
//!
//! 1. **Fetch** ([`fetcher`]): download every source URL to
//!    `sources/<category>/`, with retries and content validation
//! 2. **Merge** ([`merger`]): detect each file's syntax (hosts, adblock or
//!    mixed), extract domains, write `filters/<category>-blacklist.txt`
//! 3. **Whitelist** ([`whitelist`]): drop rules whose domain equals or is a
//!    subdomain of a whitelisted domain
//! 4. **Combine** ([`combiner`]): concatenate categories with first-seen
//!    dedup into `filters/combined-rules.txt`
//!
//! Each stage only communicates with the next through files on disk and
//! returns a typed report.
//!
//! # Quick Start
//!
//! ```ignore
//! use rulebundle::{pipeline, Fetcher, PipelineConfig};
//!
//! let config = PipelineConfig::load_or_default(None)?;
//! let fetcher = Fetcher::new(&config.fetch)?;
//! let report = pipeline::run(&config, &fetcher)?;
//! println!("{} rules bundled", report.bundle.unique);
//! ```
//!
//! # Whitelist matching
//!
//! Matching is suffix-exact: `ads.example.com` is covered by `example.com`,
//! `notexample.com` is not.
//!
//! ```
//! use rulebundle::Whitelist;
//!
//! let whitelist = Whitelist::parse("example.com\n");
//! assert!(whitelist.contains("ads.example.com"));
//! assert!(!whitelist.contains("notexample.com"));
//! ```

mod error;
mod manifest;
mod stage;

pub mod combiner;
pub mod config;
pub mod converter;
pub mod fetcher;
pub mod merger;
pub mod pipeline;
pub mod rule;
pub mod whitelist;

// Re-export core types
pub use error::{Error, Result};
pub use stage::{CategoryOutcome, SkipReason, StageReport};

// Re-export configuration
pub use config::{CategoryConfig, PipelineConfig};

// Re-export stage entry points
pub use combiner::BundleStats;
pub use converter::{detect_format, extract_domains, SourceFormat};
pub use fetcher::{Fetcher, FetchReport};
pub use manifest::{FetchManifest, SourceRecord};
pub use whitelist::Whitelist;
