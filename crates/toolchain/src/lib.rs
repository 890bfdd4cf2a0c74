//! # toolchain
//!
//! Version resolution and binary provisioning for the OpenTofu engine.
//!
//! This crate provides functionality for:
//! - Resolving a user-supplied version string (`""`, `latest`, `1.8.2`)
//! - Mapping the host platform onto upstream release names
//! - Downloading and extracting release archives (`.tar.gz`)
//! - Caching installed binaries per version
//!
//! ## Example
//!
//! ```no_run
//! use toolchain::{Client, Strategy, version};
//!
//! let client = Client::new();
//! let spec = version::resolve("latest").unwrap();
//!
//! let result = client
//!     .install(&spec, &Strategy::Download { install_dir: ".".into() })
//!     .expect("installation failed");
//!
//! println!("{result}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod backend;
pub mod error;
pub mod install;
pub mod platform;
pub mod types;
pub mod version;

pub use error::{Error, ErrorCategory, Result};
pub use types::{InstallResult, Platform, Source, Tool};
pub use version::{DEFAULT_TOFU_VERSION, Version, VersionSpec};

use backend::Backend;
pub use backend::MockBackend;
use backend::github::GitHubBackend;
use install::Installer;
use install::cached::CachedInstaller;
use install::direct::DirectInstaller;
use std::path::PathBuf;

/// How the engine binary should be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Download and extract into `install_dir` on every run.
    Download {
        /// Destination directory.
        install_dir: PathBuf,
    },
    /// Reuse binaries cached per version under `cache_dir`.
    Cached {
        /// Cache root.
        cache_dir: PathBuf,
    },
}

/// High-level client for provisioning operations.
pub struct Client {
    backend: Box<dyn Backend>,
    tool: Tool,
    platform: Option<Platform>,
}

impl Client {
    /// Create a new Client with the default GitHub backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(Box::new(GitHubBackend::new()))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            tool: Tool::Tofu,
            platform: None,
        }
    }

    /// Pin the target platform instead of detecting the host.
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// The platform downloads are made for.
    pub fn target_platform(&self) -> Result<Platform> {
        match &self.platform {
            Some(p) => Ok(p.clone()),
            None => platform::detect(),
        }
    }

    /// Provision the engine for `spec` using `strategy`.
    pub fn install(&self, spec: &VersionSpec, strategy: &Strategy) -> Result<InstallResult> {
        let platform = self.target_platform()?;

        let installer: Box<dyn Installer> = match strategy {
            Strategy::Download { install_dir } => Box::new(DirectInstaller::new(install_dir)),
            Strategy::Cached { cache_dir } => Box::new(CachedInstaller::new(cache_dir)),
        };

        log::info!(
            "Provisioning {} {spec} for {platform} ({} strategy)",
            self.tool,
            installer.name()
        );

        installer.install(self.backend.as_ref(), self.tool, &platform, spec)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
