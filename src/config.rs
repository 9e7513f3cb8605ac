//! Pipeline configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields the built-in ads/malware/adult pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::converter::DEFAULT_DETECT_PREFIX;
use crate::{Error, Result};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rulebundle.yml";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw downloads, one sub-directory per category
    pub sources_dir: PathBuf,
    /// Per-category blacklists and whitelists
    pub filters_dir: PathBuf,
    /// Final bundle path
    pub output: PathBuf,
    /// Whitelist files applied to every category
    pub global_whitelist: Vec<PathBuf>,
    /// Write `<category>-whitelisted-removed.txt` audit files
    pub audit_removed: bool,
    pub fetch: FetchConfig,
    pub merge: MergeConfig,
    pub bundle: BundleConfig,
    pub categories: Vec<CategoryConfig>,
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Extra attempts after the first one for transient failures
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// Pause between successive source downloads
    pub request_delay_secs: u64,
    /// Smallest body accepted as a real list
    pub min_bytes: usize,
    pub user_agent: String,
}

/// Merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Bytes inspected for format detection
    pub detect_prefix_bytes: usize,
}

/// Bundle header settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub title: String,
    /// Free-form `!` lines appended to the header
    pub description: Vec<String>,
}

/// One category: its upstream sources and its own whitelist files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Defaults to `<filters_dir>/<name>-whitelist.txt` when empty
    #[serde(default)]
    pub whitelist: Vec<PathBuf>,
}

impl CategoryConfig {
    /// Create a category with the given sources.
    pub fn new(name: impl Into<String>, sources: &[&str]) -> Self {
        Self {
            name: name.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            whitelist: Vec::new(),
        }
    }

    /// Display name used in the bundle coverage line (`ads` -> `Ads`).
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 3,
            retry_delay_secs: 5,
            request_delay_secs: 1,
            min_bytes: 100,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            detect_prefix_bytes: DEFAULT_DETECT_PREFIX,
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            title: "AdGuard Home Private Rules Bundle".to_string(),
            description: vec![
                "Personal whitelist applied".to_string(),
                "Auto-update: Daily at 06:00 UTC".to_string(),
            ],
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources_dir: PathBuf::from("sources"),
            filters_dir: PathBuf::from("filters"),
            output: PathBuf::from("filters").join("combined-rules.txt"),
            global_whitelist: vec![PathBuf::from("whitelist.txt")],
            audit_removed: true,
            fetch: FetchConfig::default(),
            merge: MergeConfig::default(),
            bundle: BundleConfig::default(),
            categories: default_categories(),
        }
    }
}

/// The built-in category set.
pub fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new(
            "ads",
            &[
                "https://adguardteam.github.io/AdGuardSDNSFilter/Filters/filter.txt",
                "https://easylist-downloads.adblockplus.org/easylist.txt",
                "https://easylist-downloads.adblockplus.org/easylistchina.txt",
            ],
        ),
        CategoryConfig::new(
            "malware",
            &[
                "https://malware-filter.pages.dev/urlhaus-filter-online.txt",
                "https://malware-filter.pages.dev/phishing-filter.txt",
            ],
        ),
        CategoryConfig::new(
            "adult",
            &["https://raw.githubusercontent.com/StevenBlack/hosts/master/alternates/porn/hosts"],
        ),
    ]
}

impl PipelineConfig {
    /// Parse a configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load `path` if given, else `rulebundle.yml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                log::debug!("Using {}", DEFAULT_CONFIG_FILE);
                Self::load(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject category sets that would collide on disk.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Config("no categories configured".to_string()));
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            let name = category.name.as_str();
            if name.is_empty() {
                return Err(Error::Config("empty category name".to_string()));
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(Error::Config(format!("invalid category name: {}", name)));
            }
            if !seen.insert(name) {
                return Err(Error::Config(format!("duplicate category: {}", name)));
            }
        }
        Ok(())
    }

    /// `sources/<category>/`
    pub fn source_dir(&self, category: &str) -> PathBuf {
        self.sources_dir.join(category)
    }

    /// `filters/<category>-blacklist.txt`
    pub fn blacklist_path(&self, category: &str) -> PathBuf {
        self.filters_dir.join(format!("{}-blacklist.txt", category))
    }

    /// `filters/<category>-blacklist-whitelisted.txt`
    pub fn whitelisted_path(&self, category: &str) -> PathBuf {
        self.filters_dir
            .join(format!("{}-blacklist-whitelisted.txt", category))
    }

    /// `filters/<category>-whitelisted-removed.txt`
    pub fn removed_path(&self, category: &str) -> PathBuf {
        self.filters_dir
            .join(format!("{}-whitelisted-removed.txt", category))
    }

    /// Global whitelist files followed by the category's own.
    pub fn whitelist_paths(&self, category: &CategoryConfig) -> Vec<PathBuf> {
        let mut paths = self.global_whitelist.clone();
        if category.whitelist.is_empty() {
            paths.push(
                self.filters_dir
                    .join(format!("{}-whitelist.txt", category.name)),
            );
        } else {
            paths.extend(category.whitelist.iter().cloned());
        }
        paths
    }

    /// Rebase every relative path onto `root`.
    pub fn with_root(mut self, root: &Path) -> Self {
        let rebase = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        self.sources_dir = rebase(&self.sources_dir);
        self.filters_dir = rebase(&self.filters_dir);
        self.output = rebase(&self.output);
        self.global_whitelist = self.global_whitelist.iter().map(rebase).collect();
        for category in &mut self.categories {
            category.whitelist = category.whitelist.iter().map(rebase).collect();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        let names: Vec<&str> = config.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ads", "malware", "adult"]);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
        assert_eq!(config.fetch.retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.source_dir("ads"), PathBuf::from("sources/ads"));
        assert_eq!(config.blacklist_path("ads"), PathBuf::from("filters/ads-blacklist.txt"));
        assert_eq!(
            config.whitelisted_path("ads"),
            PathBuf::from("filters/ads-blacklist-whitelisted.txt")
        );
        assert_eq!(
            config.removed_path("malware"),
            PathBuf::from("filters/malware-whitelisted-removed.txt")
        );
    }

    #[test]
    fn test_whitelist_paths() {
        let config = PipelineConfig::default();
        let paths = config.whitelist_paths(&config.categories[1]);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("whitelist.txt"),
                PathBuf::from("filters/malware-whitelist.txt"),
            ]
        );
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = r#"
filters_dir: out
fetch:
  retries: 1
categories:
  - name: ads
    sources:
      - https://example.com/list.txt
  - name: custom
    whitelist:
      - custom-allow.txt
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.filters_dir, PathBuf::from("out"));
        assert_eq!(config.fetch.retries, 1);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[1].sources.len(), 0);
        assert_eq!(
            config.whitelist_paths(&config.categories[1]),
            vec![PathBuf::from("whitelist.txt"), PathBuf::from("custom-allow.txt")]
        );
    }

    #[test]
    fn test_validate_rejects_bad_categories() {
        let duplicate = "categories:\n  - name: ads\n  - name: ads\n";
        assert!(PipelineConfig::from_yaml(duplicate).is_err());

        let traversal = "categories:\n  - name: ../etc\n";
        assert!(PipelineConfig::from_yaml(traversal).is_err());

        let empty = "categories: []\n";
        assert!(PipelineConfig::from_yaml(empty).is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(CategoryConfig::new("ads", &[]).display_name(), "Ads");
        assert_eq!(CategoryConfig::new("", &[]).display_name(), "");
    }

    #[test]
    fn test_with_root() {
        let root = Path::new("/work");
        let config = PipelineConfig::default().with_root(root);
        assert_eq!(config.sources_dir, PathBuf::from("/work/sources"));
        assert_eq!(config.output, PathBuf::from("/work/filters/combined-rules.txt"));
        assert_eq!(config.global_whitelist, vec![PathBuf::from("/work/whitelist.txt")]);
    }
}
