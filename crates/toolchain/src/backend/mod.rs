//! Release sources.
//!
//! The [`Backend`] trait abstracts where release archives come from. The
//! production implementation is [`github::GitHubBackend`]; tests use
//! [`MockBackend`], which serves fabricated archives from memory.
//!
//! ```
//! use toolchain::backend::{Backend, MockBackend};
//! use toolchain::{Platform, Tool, Version};
//!
//! let mock = MockBackend::new().with_latest(Version::new(1, 9, 0));
//! assert_eq!(mock.latest_version(Tool::Tofu).unwrap(), Version::new(1, 9, 0));
//! ```

pub mod github;

use crate::error::{Error, Result};
use crate::types::{Platform, Tool};
use crate::version::Version;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Backend trait for fetching releases.
pub trait Backend: Send + Sync {
    /// The newest published (non-prerelease) version.
    fn latest_version(&self, tool: Tool) -> Result<Version>;

    /// Download the release archive for a version and platform.
    ///
    /// Returns the raw `.tar.gz` bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::DownloadFailed` on any transport or status failure.
    fn download_archive(&self, tool: Tool, version: &Version, platform: &Platform)
    -> Result<Vec<u8>>;
}

/// In-memory backend for testing without network access.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    archives: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    latest: Option<Version>,
    downloads: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the version reported as latest.
    #[must_use]
    pub fn with_latest(mut self, version: Version) -> Self {
        self.latest = Some(version);
        self
    }

    /// Serve `data` for the given version on every platform.
    pub fn add_archive(&self, version: &Version, data: Vec<u8>) {
        if let Ok(mut archives) = self.archives.lock() {
            archives.insert(version.to_string(), data);
        }
    }

    /// Number of archive downloads served so far.
    #[must_use]
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl Backend for MockBackend {
    fn latest_version(&self, tool: Tool) -> Result<Version> {
        self.latest.clone().ok_or_else(|| Error::HttpError {
            message: format!("no latest release configured for {tool}"),
            status: Some(404),
        })
    }

    fn download_archive(
        &self,
        tool: Tool,
        version: &Version,
        platform: &Platform,
    ) -> Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let archives = self
            .archives
            .lock()
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
        archives
            .get(&version.to_string())
            .cloned()
            .ok_or_else(|| Error::DownloadFailed {
                url: format!("mock://{}", tool.archive_name(version, platform)),
                message: "HTTP 404".to_string(),
            })
    }
}
