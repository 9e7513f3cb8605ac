//! Upstream list downloader.
//!
//! This module provides `Fetcher` which handles:
//! - Downloading every source URL of every category
//! - Retrying timeouts, transport errors and 5xx responses
//! - Gzip decompression
//! - Rejecting truncated bodies and HTML error pages served as 200
//! - Writing `sources/<category>/<NN>-<name>.txt` plus a fetch manifest
//! - Removing source files left over from URLs no longer configured

use ahash::AHashSet;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::{CategoryConfig, FetchConfig, PipelineConfig};
use crate::manifest::{FetchManifest, SourceRecord};
use crate::{Error, Result};

/// Raw HTTP response as seen by the fetcher.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Minimal blocking HTTP GET abstraction.
pub trait Transport {
    /// Issue a GET request. Non-2xx statuses are returned, not turned into errors.
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// `reqwest` blocking transport with a browser-like user agent.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport from fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Result of the fetch stage: one manifest per category.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub categories: Vec<FetchManifest>,
}

impl FetchReport {
    pub fn succeeded(&self) -> usize {
        self.categories.iter().map(|m| m.succeeded()).sum()
    }

    pub fn failed(&self) -> usize {
        self.categories.iter().map(|m| m.failed()).sum()
    }

    /// At least one source in any category was downloaded.
    pub fn is_usable(&self) -> bool {
        self.succeeded() > 0
    }
}

/// Downloads upstream lists with retry and content validation.
///
/// # Example
///
/// ```ignore
/// use rulebundle::fetcher::Fetcher;
/// use rulebundle::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// let fetcher = Fetcher::new(&config.fetch)?;
/// let report = fetcher.fetch_all(&config)?;
/// println!("{} sources downloaded", report.succeeded());
/// ```
pub struct Fetcher<T: Transport = HttpTransport> {
    transport: T,
    config: FetchConfig,
}

impl Fetcher<HttpTransport> {
    /// Create a fetcher backed by `reqwest`.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?, config.clone()))
    }
}

impl<T: Transport> Fetcher<T> {
    /// Create a fetcher with a custom transport.
    pub fn with_transport(transport: T, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch every category of the pipeline into `sources_dir`.
    ///
    /// Individual source failures are logged and recorded; only failing to
    /// create a directory or write a file is an error.
    pub fn fetch_all(&self, pipeline: &PipelineConfig) -> Result<FetchReport> {
        log::info!("Fetching upstream rules...");
        let mut report = FetchReport::default();
        let mut first = true;

        for category in &pipeline.categories {
            let dir = pipeline.source_dir(&category.name);
            let manifest = self.fetch_category(category, &dir, &mut first)?;
            if manifest.succeeded() == 0 && !category.sources.is_empty() {
                log::warn!("{}: no source could be downloaded", category.name);
            }
            report.categories.push(manifest);
        }

        log::info!(
            "Fetch complete: {} downloaded, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Fetch one category into `dir` and save its manifest there.
    fn fetch_category(
        &self,
        category: &CategoryConfig,
        dir: &Path,
        first: &mut bool,
    ) -> Result<FetchManifest> {
        log::info!("Processing category: {}", category.name);
        fs::create_dir_all(dir)?;

        let mut manifest = FetchManifest::now(&category.name);

        for (i, url) in category.sources.iter().enumerate() {
            if !*first {
                self.pause(self.config.request_delay());
            }
            *first = false;

            let file = source_file_name(i + 1, url);
            let record = match self.fetch_url(url) {
                Ok(body) => {
                    fs::write(dir.join(&file), &body)?;
                    log::info!("Saved {} ({} bytes)", file, body.len());
                    SourceRecord {
                        url: url.clone(),
                        file,
                        bytes: body.len(),
                        error: None,
                    }
                }
                Err(e) => {
                    log::warn!("Failed to download {}: {}", url, e);
                    SourceRecord {
                        url: url.clone(),
                        file,
                        bytes: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            manifest.sources.push(record);
        }

        let expected: AHashSet<&str> = manifest.sources.iter().map(|s| s.file.as_str()).collect();
        remove_stale_sources(dir, &expected)?;

        manifest.save(dir)?;
        Ok(manifest)
    }

    /// Download one URL, retrying transient failures.
    pub fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            log::debug!("GET {} (attempt {})", url, attempt + 1);
            let result = self.transport.get(url).and_then(|response| {
                if (200..300).contains(&response.status) {
                    self.validate_body(response.body)
                } else {
                    Err(Error::HttpStatus(response.status))
                }
            });

            match result {
                Err(e) if e.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    log::warn!(
                        "{}: {} (retry {}/{})",
                        url,
                        e,
                        attempt,
                        self.config.retries
                    );
                    self.pause(self.config.retry_delay());
                }
                other => return other,
            }
        }
    }

    /// Decompress and sanity-check a downloaded body.
    fn validate_body(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        let body = if is_gzip(&raw) {
            let mut decoder = GzDecoder::new(&raw[..]);
            let mut data = Vec::new();
            decoder
                .read_to_end(&mut data)
                .map_err(|e| Error::InvalidContent(format!("gzip decompression failed: {}", e)))?;
            data
        } else {
            raw
        };

        if body.len() < self.config.min_bytes {
            return Err(Error::InvalidContent(format!(
                "body too small: {} bytes (minimum {})",
                body.len(),
                self.config.min_bytes
            )));
        }

        if looks_like_html(&body) {
            return Err(Error::InvalidContent("received an HTML page".to_string()));
        }

        Ok(body)
    }

    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

/// Delete `*.txt` files in `dir` that no configured source writes anymore.
fn remove_stale_sources(dir: &Path, expected: &AHashSet<&str>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map(|ext| ext != "txt").unwrap_or(true) {
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if !expected.contains(&*name) {
            fs::remove_file(&path)?;
            log::info!("Removed stale source {:?}", path);
        }
    }
    Ok(())
}

/// Check if data is gzip compressed.
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Check if a body starts like an HTML document.
fn looks_like_html(data: &[u8]) -> bool {
    let data = data.strip_prefix(&[0xef, 0xbb, 0xbf][..]).unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let head = &data[start..data.len().min(start + 64)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Name of the file a source URL is saved to: `NN-<last path segment>.txt`.
///
/// ```
/// use rulebundle::fetcher::source_file_name;
///
/// assert_eq!(source_file_name(1, "https://example.com/lists/easylist.txt"), "01-easylist.txt");
/// assert_eq!(source_file_name(2, "https://example.com/"), "02.txt");
/// ```
pub fn source_file_name(index: usize, url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);

    // Skip the host, use the last non-empty path segment
    let segment = path
        .split('/')
        .skip(1)
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or_default();
    let stem = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    };

    let slug: String = stem
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        format!("{:02}.txt", index)
    } else {
        format!("{:02}-{}.txt", index, slug)
    }
}
