//! Sequential execution of all stages.

use crate::combiner::{combine, BundleStats};
use crate::config::PipelineConfig;
use crate::fetcher::{FetchReport, Fetcher, Transport};
use crate::merger::{merge_all, MergeReport};
use crate::whitelist::{filter_all, WhitelistReport};
use crate::{Error, Result};

/// Reports of a full pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// `None` when the run started from sources already on disk
    pub fetch: Option<FetchReport>,
    pub merge: MergeReport,
    pub whitelist: WhitelistReport,
    pub bundle: BundleStats,
}

/// Run merge → whitelist → combine over the sources already on disk.
pub fn run_offline(config: &PipelineConfig) -> Result<PipelineReport> {
    run_stages(config, None)
}

/// Run fetch → merge → whitelist → combine.
///
/// A fetch that downloads nothing is not fatal: the merge still runs over
/// whatever sources a previous run left behind.
pub fn run<T: Transport>(config: &PipelineConfig, fetcher: &Fetcher<T>) -> Result<PipelineReport> {
    let fetch = fetcher.fetch_all(config)?;
    if !fetch.is_usable() {
        log::warn!("No upstream source could be downloaded, merging existing sources");
    }
    run_stages(config, Some(fetch))
}

fn run_stages(config: &PipelineConfig, fetch: Option<FetchReport>) -> Result<PipelineReport> {
    let merge = merge_all(config)?;
    if !merge.is_usable() {
        log::warn!("No category was merged, bundling previous blacklists");
    }

    let whitelist = filter_all(config, config.audit_removed)?;

    let bundle = match combine(config) {
        Ok(stats) => stats,
        Err(Error::NothingProduced(_)) => return Err(Error::NothingProduced("pipeline")),
        Err(e) => return Err(e),
    };

    Ok(PipelineReport {
        fetch,
        merge,
        whitelist,
        bundle,
    })
}
