//! Direct-download strategy.
//!
//! Downloads `tofu_<version>_<os>_<arch>.tar.gz`, extracts the entry named
//! exactly like the binary, writes it into the install directory and restores
//! the mode bits recorded in the archive. Nothing is cached between calls.

use crate::archive;
use crate::backend::Backend;
use crate::error::Result;
use crate::install::{Installer, binary_file_name, concrete_version};
use crate::types::{InstallResult, Platform, Tool};
use crate::version::VersionSpec;
use std::path::PathBuf;

/// Installs the engine binary into a fixed directory.
#[derive(Debug, Clone)]
pub struct DirectInstaller {
    install_dir: PathBuf,
}

impl DirectInstaller {
    /// Install into `install_dir` (usually the process working directory).
    #[must_use]
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }
}

impl Installer for DirectInstaller {
    fn name(&self) -> &'static str {
        "download"
    }

    fn install(
        &self,
        backend: &dyn Backend,
        tool: Tool,
        platform: &Platform,
        spec: &VersionSpec,
    ) -> Result<InstallResult> {
        let version = concrete_version(backend, tool, spec)?;
        let file_name = binary_file_name(tool, platform);

        let data = backend.download_archive(tool, &version, platform)?;
        let binary = archive::extract_binary(&data, &file_name)?;
        let path = archive::write_executable(&self.install_dir, &file_name, &binary)?;

        log::info!("Installed {tool} {version} at {}", path.display());

        Ok(InstallResult {
            tool,
            version,
            path,
            from_cache: false,
        })
    }
}
