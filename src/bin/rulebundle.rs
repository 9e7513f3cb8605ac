//! rulebundle: CLI for the filter-list pipeline.

use clap::{Parser, Subcommand};
use rulebundle::combiner::{self, BundleStats};
use rulebundle::merger::{self, MergeReport};
use rulebundle::whitelist::{self, WhitelistReport};
use rulebundle::{pipeline, CategoryOutcome, Error, FetchReport, Fetcher, PipelineConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rulebundle")]
#[command(version)]
#[command(about = "Fetch, merge, whitelist and bundle DNS filter lists", long_about = None)]
struct Cli {
    /// Pipeline config (YAML); defaults to ./rulebundle.yml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download upstream lists into sources/<category>/
    Fetch,

    /// Merge sources into filters/<category>-blacklist.txt
    Merge,

    /// Apply whitelists to the category blacklists in place
    Whitelist {
        /// Do not write <category>-whitelisted-removed.txt audit files
        #[arg(long)]
        no_audit: bool,
    },

    /// Combine category blacklists into the final bundle
    Combine,

    /// Run every stage in order
    Run {
        /// Skip downloading and use the sources already on disk
        #[arg(long)]
        offline: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<(), Error> {
    let config = PipelineConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch => {
            let report = Fetcher::new(&config.fetch)?.fetch_all(&config)?;
            print_fetch(&report);
            if !report.is_usable() {
                return Err(Error::NothingProduced("fetch"));
            }
        }
        Commands::Merge => {
            let report = merger::merge_all(&config)?;
            print_merge(&report);
            if !report.is_usable() {
                return Err(Error::NothingProduced("merge"));
            }
        }
        Commands::Whitelist { no_audit } => {
            let audit = config.audit_removed && !no_audit;
            let report = whitelist::filter_all(&config, audit)?;
            print_whitelist(&report);
        }
        Commands::Combine => {
            let stats = combiner::combine(&config)?;
            print_bundle(&stats, &config);
        }
        Commands::Run { offline } => {
            let report = if offline {
                pipeline::run_offline(&config)?
            } else {
                pipeline::run(&config, &Fetcher::new(&config.fetch)?)?
            };
            if let Some(fetch) = &report.fetch {
                print_fetch(fetch);
            }
            print_merge(&report.merge);
            print_whitelist(&report.whitelist);
            print_bundle(&report.bundle, &config);
        }
    }

    Ok(())
}

fn print_fetch(report: &FetchReport) {
    println!("\nFetch:");
    for manifest in &report.categories {
        println!(
            "  {}: {} downloaded, {} failed",
            manifest.category,
            manifest.succeeded(),
            manifest.failed()
        );
        for source in manifest.sources.iter().filter(|s| !s.is_ok()) {
            println!(
                "    {} ({})",
                source.url,
                source.error.as_deref().unwrap_or_default()
            );
        }
    }
}

fn print_merge(report: &MergeReport) {
    println!("\nMerge: {}/{} categories", report.produced_count(), report.outcomes.len());
    for (category, outcome) in &report.outcomes {
        match outcome {
            CategoryOutcome::Produced(stats) => println!(
                "  {}: {} unique rules from {} files",
                category,
                stats.rules,
                stats.files.len()
            ),
            CategoryOutcome::Skipped(reason) => println!("  {}: skipped ({})", category, reason),
        }
    }
}

fn print_whitelist(report: &WhitelistReport) {
    println!("\nWhitelist:");
    for (category, outcome) in &report.outcomes {
        match outcome {
            CategoryOutcome::Produced(stats) => println!(
                "  {}: {} -> {} rules ({} removed)",
                category, stats.original, stats.kept, stats.removed
            ),
            CategoryOutcome::Skipped(reason) => println!("  {}: skipped ({})", category, reason),
        }
    }
}

fn print_bundle(stats: &BundleStats, config: &PipelineConfig) {
    println!("\nBundle:");
    println!(
        "  {} unique rules ({} before dedup, {} duplicates removed)",
        stats.unique, stats.total_before_dedup, stats.duplicates_removed
    );
    if !stats.missing.is_empty() {
        println!("  missing categories: {}", stats.missing.join(", "));
    }
    println!("  saved to {:?}", config.output);
}
