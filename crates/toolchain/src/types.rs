//! Core types for engine provisioning.

use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Engines that can be provisioned.
///
/// # Example
///
/// ```
/// use toolchain::Tool;
///
/// let tool = Tool::Tofu;
/// assert_eq!(tool.binary_name(), "tofu");
/// assert_eq!(tool.github_repo(), "opentofu/opentofu");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// OpenTofu, the open-source Terraform fork.
    Tofu,
}

impl Tool {
    /// Get the tool name as a string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tofu => "opentofu",
        }
    }

    /// Get the GitHub repository in "owner/repo" format.
    #[must_use]
    pub fn github_repo(&self) -> &'static str {
        match self {
            Self::Tofu => "opentofu/opentofu",
        }
    }

    /// Name of the executable, both inside the release archive and on disk.
    #[must_use]
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Tofu => "tofu",
        }
    }

    /// File name of the release archive for a version and platform.
    #[must_use]
    pub fn archive_name(&self, version: &Version, platform: &Platform) -> String {
        format!(
            "{}_{}_{}_{}.tar.gz",
            self.binary_name(),
            version,
            platform.os,
            platform.arch
        )
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Target platform in the upstream release naming convention.
///
/// # Example
///
/// ```
/// use toolchain::Platform;
///
/// let platform = Platform::new("linux", "amd64");
/// assert_eq!(platform.to_string(), "linux_amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system as upstream spells it (e.g. "linux", "darwin").
    pub os: String,
    /// Architecture as upstream spells it (e.g. "amd64", "arm64").
    pub arch: String,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Check if this platform is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

/// One acceptable source for the caching installer, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A specific release.
    Exact(Version),
    /// The newest release published upstream.
    Latest,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "exact:{v}"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// Result of a provisioning operation.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// The tool that was installed.
    pub tool: Tool,
    /// The concrete version on disk.
    pub version: Version,
    /// Absolute path to the executable.
    pub path: PathBuf,
    /// Whether an existing cached binary was reused instead of downloading.
    pub from_cache: bool,
}

impl fmt::Display for InstallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from_cache {
            write!(
                f,
                "{} {} reused from cache at {}",
                self.tool,
                self.version,
                self.path.display()
            )
        } else {
            write!(
                f,
                "{} {} installed at {}",
                self.tool,
                self.version,
                self.path.display()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_metadata() {
        assert_eq!(Tool::Tofu.name(), "opentofu");
        assert_eq!(Tool::Tofu.binary_name(), "tofu");
        assert_eq!(format!("{}", Tool::Tofu), "opentofu");
    }

    #[test]
    fn test_tool_serialization() {
        let json = serde_json::to_string(&Tool::Tofu).unwrap();
        assert_eq!(json, "\"tofu\"");
    }

    #[test]
    fn test_archive_name() {
        let name = Tool::Tofu.archive_name(&Version::new(1, 8, 2), &Platform::new("linux", "arm64"));
        assert_eq!(name, "tofu_1.8.2_linux_arm64.tar.gz");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Exact(Version::new(1, 6, 0)).to_string(), "exact:1.6.0");
        assert_eq!(Source::Latest.to_string(), "latest");
    }

    #[test]
    fn test_install_result_display() {
        let result = InstallResult {
            tool: Tool::Tofu,
            version: Version::new(1, 8, 2),
            path: PathBuf::from("/work/tofu"),
            from_cache: false,
        };
        let display = format!("{result}");
        assert!(display.contains("1.8.2"));
        assert!(display.contains("installed"));

        let cached = InstallResult {
            from_cache: true,
            ..result
        };
        assert!(format!("{cached}").contains("cache"));
    }
}
