//! Typed per-category stage results.

use std::fmt;

/// Why a stage did not produce output for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `sources/<category>/` does not exist
    MissingSourceDir,
    /// Source directory holds no readable `.txt` files
    NoSourceFiles,
    /// Sources were read but yielded no valid domain
    NoRules,
    /// `filters/<category>-blacklist.txt` does not exist
    MissingBlacklist,
    /// No whitelist entries apply to the category
    EmptyWhitelist,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingSourceDir => "source directory not found",
            SkipReason::NoSourceFiles => "no source files",
            SkipReason::NoRules => "no valid rules extracted",
            SkipReason::MissingBlacklist => "blacklist not found",
            SkipReason::EmptyWhitelist => "whitelist is empty",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one stage for one category.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryOutcome<T> {
    Produced(T),
    Skipped(SkipReason),
}

impl<T> CategoryOutcome<T> {
    pub fn is_produced(&self) -> bool {
        matches!(self, CategoryOutcome::Produced(_))
    }

    pub fn produced(&self) -> Option<&T> {
        match self {
            CategoryOutcome::Produced(stats) => Some(stats),
            CategoryOutcome::Skipped(_) => None,
        }
    }
}

/// Category-keyed list of outcomes returned by a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport<T> {
    pub outcomes: Vec<(String, CategoryOutcome<T>)>,
}

impl<T> Default for StageReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T> StageReport<T> {
    pub fn push(&mut self, category: &str, outcome: CategoryOutcome<T>) {
        self.outcomes.push((category.to_string(), outcome));
    }

    pub fn produced_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_produced()).count()
    }

    /// At least one category produced output.
    pub fn is_usable(&self) -> bool {
        self.produced_count() > 0
    }

    pub fn get(&self, category: &str) -> Option<&CategoryOutcome<T>> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, outcome)| outcome)
    }
}

/// Local timestamp used in generated headers.
pub fn generated_at() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
