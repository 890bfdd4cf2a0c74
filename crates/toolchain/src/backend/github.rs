//! GitHub releases backend.
//!
//! Archives are fetched from the public download URLs, which are not subject
//! to API rate limiting. Only [`Backend::latest_version`] touches the REST API
//! (60 unauthenticated requests per hour).

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Platform, Tool};
use crate::version::Version;
use serde::Deserialize;

/// Maximum archive size. OpenTofu archives are around 25 MB.
const MAX_BODY_SIZE: u64 = 256 * 1024 * 1024;

const USER_AGENT: &str = "tofu-runner";

/// GitHub releases backend.
///
/// # Example
///
/// ```no_run
/// use toolchain::backend::github::GitHubBackend;
/// use toolchain::backend::Backend;
/// use toolchain::Tool;
///
/// let backend = GitHubBackend::new();
/// let latest = backend.latest_version(Tool::Tofu).unwrap();
/// println!("Latest OpenTofu: {latest}");
/// ```
pub struct GitHubBackend {
    agent: ureq::Agent,
    /// Base for release downloads.
    download_base: String,
    /// GitHub API base URL.
    api_base: String,
}

impl GitHubBackend {
    /// Create a new GitHub backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bases("https://github.com", "https://api.github.com")
    }

    /// Create a backend against custom hosts (mirrors, tests).
    #[must_use]
    pub fn with_bases(download_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            download_base: download_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the download URL of a release archive.
    #[must_use]
    pub fn archive_url(&self, tool: Tool, version: &Version, platform: &Platform) -> String {
        format!(
            "{}/{}/releases/download/v{}/{}",
            self.download_base,
            tool.github_repo(),
            version,
            tool.archive_name(version, platform)
        )
    }

    fn latest_release_url(&self, tool: Tool) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_base,
            tool.github_repo()
        )
    }
}

impl Default for GitHubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for GitHubBackend {
    fn latest_version(&self, tool: Tool) -> Result<Version> {
        let url = self.latest_release_url(tool);
        log::debug!("Resolving latest {tool} release from {url}");

        let release: GitHubRelease = self
            .agent
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .call()?
            .body_mut()
            .read_json()?;

        Version::parse(&release.tag_name)
    }

    fn download_archive(
        &self,
        tool: Tool,
        version: &Version,
        platform: &Platform,
    ) -> Result<Vec<u8>> {
        let url = self.archive_url(tool, version, platform);
        log::info!("Downloading {tool} archive from {url}");

        let download_failed = |message: String| Error::DownloadFailed {
            url: url.clone(),
            message,
        };

        let mut response = self
            .agent
            .get(&url)
            .header("Accept", "application/octet-stream")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| download_failed(e.to_string()))?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(|e| download_failed(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_url() {
        let backend = GitHubBackend::new();
        let url = backend.archive_url(
            Tool::Tofu,
            &Version::new(1, 8, 2),
            &Platform::new("linux", "amd64"),
        );
        assert_eq!(
            url,
            "https://github.com/opentofu/opentofu/releases/download/v1.8.2/tofu_1.8.2_linux_amd64.tar.gz"
        );
    }

    #[test]
    fn test_latest_release_url() {
        let backend = GitHubBackend::with_bases("https://mirror.local/", "https://api.mirror.local");
        assert_eq!(
            backend.latest_release_url(Tool::Tofu),
            "https://api.mirror.local/repos/opentofu/opentofu/releases/latest"
        );
    }

    #[test]
    fn test_custom_download_base() {
        let backend = GitHubBackend::with_bases("https://mirror.local/", "https://api.github.com");
        let url = backend.archive_url(
            Tool::Tofu,
            &Version::new(1, 9, 0),
            &Platform::new("darwin", "arm64"),
        );
        assert!(url.starts_with("https://mirror.local/opentofu/opentofu/"));
        assert!(url.ends_with("tofu_1.9.0_darwin_arm64.tar.gz"));
    }

    #[test]
    fn test_deserialize_release() {
        let release: GitHubRelease =
            serde_json::from_str(r#"{"tag_name":"v1.9.0","name":"v1.9.0"}"#).unwrap();
        assert_eq!(Version::parse(&release.tag_name).unwrap(), Version::new(1, 9, 0));
    }

    #[test]
    fn test_download_archive_from_server() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock(
                "GET",
                "/opentofu/opentofu/releases/download/v1.8.2/tofu_1.8.2_linux_amd64.tar.gz",
            )
            .with_status(200)
            .with_body(b"archive-bytes")
            .create();

        let backend = GitHubBackend::with_bases(server.url(), server.url());
        let data = backend
            .download_archive(
                Tool::Tofu,
                &Version::new(1, 8, 2),
                &Platform::new("linux", "amd64"),
            )
            .unwrap();

        assert_eq!(data, b"archive-bytes");
        mock.assert();
    }

    #[test]
    fn test_download_archive_not_found() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .create();

        let backend = GitHubBackend::with_bases(server.url(), server.url());
        let err = backend
            .download_archive(
                Tool::Tofu,
                &Version::new(0, 0, 1),
                &Platform::new("linux", "amd64"),
            )
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed { .. }));
    }

    #[test]
    fn test_latest_version_from_api() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/repos/opentofu/opentofu/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name":"v1.10.1"}"#)
            .create();

        let backend = GitHubBackend::with_bases(server.url(), server.url());
        let latest = backend.latest_version(Tool::Tofu).unwrap();
        assert_eq!(latest, Version::new(1, 10, 1));
    }
}
