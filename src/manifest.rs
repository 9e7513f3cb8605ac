//! Per-category fetch manifest (`sources/<category>/manifest.json`).
//!
//! Written by the fetcher, read by the merger to name the upstream URLs in
//! the blacklist header.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::stage::generated_at;

/// File name of the manifest inside a category source directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Record of the last fetch of one category.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FetchManifest {
    pub category: String,
    /// Local time of the fetch, same format as generated headers
    #[serde(default)]
    pub fetched_at: Option<String>,
    pub sources: Vec<SourceRecord>,
}

/// Outcome of fetching one source URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    pub url: String,
    pub file: String,
    #[serde(default)]
    pub bytes: usize,
    /// `None` on success, the error message otherwise
    #[serde(default)]
    pub error: Option<String>,
}

impl SourceRecord {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl FetchManifest {
    /// Start a manifest for a fetch happening now.
    pub fn now(category: &str) -> Self {
        Self {
            category: category.to_string(),
            fetched_at: Some(generated_at()),
            sources: Vec::new(),
        }
    }

    /// Load the manifest of a category source directory.
    ///
    /// Returns `None` if the directory has no manifest or it cannot be parsed.
    pub fn load(dir: impl AsRef<Path>) -> Option<Self> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                log::warn!("Ignoring unreadable manifest {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save the manifest into a category source directory.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.as_ref().join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// URL that produced the given source file, if recorded.
    pub fn url_for(&self, file: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.file == file && s.is_ok())
            .map(|s| s.url.as_str())
    }

    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.sources.len() - self.succeeded()
    }
}
