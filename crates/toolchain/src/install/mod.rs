//! Provisioning strategies.
//!
//! An [`Installer`] turns a [`VersionSpec`] into an executable on disk.
//!
//! - [`direct::DirectInstaller`] downloads the release archive and extracts
//!   the binary into a target directory on every call.
//! - [`cached::CachedInstaller`] walks an ordered list of [`Source`]s and
//!   keeps one binary per version in a cache directory.

pub mod cached;
pub mod direct;

use crate::backend::Backend;
use crate::error::Result;
use crate::types::{InstallResult, Platform, Source, Tool};
use crate::version::{Version, VersionSpec};

/// Trait for provisioning strategies.
pub trait Installer: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &'static str;

    /// Make the requested version available and return where it lives.
    ///
    /// # Errors
    ///
    /// Returns `DownloadFailed`, `BinaryNotFound` or `InstallFailed` for the
    /// corresponding stage.
    fn install(
        &self,
        backend: &dyn Backend,
        tool: Tool,
        platform: &Platform,
        spec: &VersionSpec,
    ) -> Result<InstallResult>;
}

/// Ordered sources for a version spec: the exact version first, then latest.
#[must_use]
pub fn sources_for(spec: &VersionSpec) -> Vec<Source> {
    match spec {
        VersionSpec::Exact(v) => vec![Source::Exact(v.clone()), Source::Latest],
        VersionSpec::Latest => vec![Source::Latest],
    }
}

/// Resolve a version spec to a concrete version, asking the backend for
/// `latest`.
pub fn concrete_version(backend: &dyn Backend, tool: Tool, spec: &VersionSpec) -> Result<Version> {
    match spec {
        VersionSpec::Exact(v) => Ok(v.clone()),
        VersionSpec::Latest => backend.latest_version(tool),
    }
}

/// File name of the executable on disk for a platform.
#[must_use]
pub fn binary_file_name(tool: Tool, platform: &Platform) -> String {
    if platform.is_windows() {
        format!("{}.exe", tool.binary_name())
    } else {
        tool.binary_name().to_string()
    }
}
