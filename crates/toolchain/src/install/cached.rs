//! Caching installer.
//!
//! Accepts an ordered list of [`Source`]s and returns the first one that can
//! be satisfied. Binaries are kept at `<cache_dir>/<version>/tofu` and reused
//! on later runs when still executable.

use crate::archive;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::install::{Installer, binary_file_name, sources_for};
use crate::types::{InstallResult, Platform, Source, Tool};
use crate::version::{Version, VersionSpec};
use std::path::{Path, PathBuf};

/// Installer with a per-version binary cache.
#[derive(Debug, Clone)]
pub struct CachedInstaller {
    cache_dir: PathBuf,
}

impl CachedInstaller {
    /// Cache binaries under `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Default cache location: `<user cache dir>/tofu-runner/engines`.
    #[must_use]
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("tofu-runner").join("engines"))
    }

    /// The cache root.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Try each source in order and return the first ready binary.
    ///
    /// # Errors
    ///
    /// Returns the error of the last source when none succeeds.
    pub fn ensure(
        &self,
        backend: &dyn Backend,
        tool: Tool,
        platform: &Platform,
        sources: &[Source],
    ) -> Result<InstallResult> {
        let mut last_error: Option<Error> = None;

        for source in sources {
            match self.ensure_source(backend, tool, platform, source) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    log::warn!("Installer source {source} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::SourcesExhausted("no sources given".to_string())))
    }

    fn ensure_source(
        &self,
        backend: &dyn Backend,
        tool: Tool,
        platform: &Platform,
        source: &Source,
    ) -> Result<InstallResult> {
        let version = match source {
            Source::Exact(v) => v.clone(),
            Source::Latest => backend.latest_version(tool)?,
        };

        let file_name = binary_file_name(tool, platform);
        let version_dir = self.version_dir(&version);
        let cached = version_dir.join(&file_name);

        if archive::is_executable(&cached) {
            log::debug!("Reusing cached {tool} {version} at {}", cached.display());
            let path = std::fs::canonicalize(&cached).map_err(|e| Error::install(&cached, e))?;
            return Ok(InstallResult {
                tool,
                version,
                path,
                from_cache: true,
            });
        }

        let data = backend.download_archive(tool, &version, platform)?;
        let binary = archive::extract_binary(&data, &file_name)?;
        let path = archive::write_executable(&version_dir, &file_name, &binary)?;

        log::info!("Cached {tool} {version} at {}", path.display());

        Ok(InstallResult {
            tool,
            version,
            path,
            from_cache: false,
        })
    }

    fn version_dir(&self, version: &Version) -> PathBuf {
        self.cache_dir.join(version.to_string())
    }
}

impl Installer for CachedInstaller {
    fn name(&self) -> &'static str {
        "cached"
    }

    fn install(
        &self,
        backend: &dyn Backend,
        tool: Tool,
        platform: &Platform,
        spec: &VersionSpec,
    ) -> Result<InstallResult> {
        self.ensure(backend, tool, platform, &sources_for(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_targz;
    use crate::backend::MockBackend;
    use tempfile::TempDir;

    fn linux() -> Platform {
        Platform::new("linux", "amd64")
    }

    fn archive_with_binary() -> Vec<u8> {
        build_targz(&[("tofu", b"cached-tofu".as_slice(), 0o755)])
    }

    #[test]
    fn test_second_install_reuses_cache() {
        let dir = TempDir::new().unwrap();
        let version = Version::new(1, 8, 2);
        let backend = MockBackend::new();
        backend.add_archive(&version, archive_with_binary());

        let installer = CachedInstaller::new(dir.path());
        let spec = VersionSpec::Exact(version.clone());

        let first = installer.install(&backend, Tool::Tofu, &linux(), &spec).unwrap();
        let second = installer.install(&backend, Tool::Tofu, &linux(), &spec).unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.path, second.path);
        assert!(first.path.ends_with("1.8.2/tofu"));
        assert_eq!(backend.download_count(), 1);
    }

    #[test]
    fn test_falls_back_to_latest() {
        let dir = TempDir::new().unwrap();
        let latest = Version::new(1, 9, 0);
        let backend = MockBackend::new().with_latest(latest.clone());
        backend.add_archive(&latest, archive_with_binary());

        let installer = CachedInstaller::new(dir.path());
        let result = installer
            .install(
                &backend,
                Tool::Tofu,
                &linux(),
                &VersionSpec::Exact(Version::new(1, 8, 2)),
            )
            .unwrap();

        assert_eq!(result.version, latest);
    }

    #[test]
    fn test_all_sources_fail_reports_last_error() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let installer = CachedInstaller::new(dir.path());

        let err = installer
            .ensure(
                &backend,
                Tool::Tofu,
                &linux(),
                &[Source::Exact(Version::new(1, 8, 2))],
            )
            .unwrap_err();
        assert!(matches!(err, Error::DownloadFailed { .. }));

        let err = installer.ensure(&backend, Tool::Tofu, &linux(), &[]).unwrap_err();
        assert!(matches!(err, Error::SourcesExhausted(_)));
    }

    #[test]
    fn test_default_cache_dir_suffix() {
        if let Some(dir) = CachedInstaller::default_cache_dir() {
            assert!(dir.ends_with("tofu-runner/engines"));
        }
    }
}
