//! Version resolution.
//!
//! Turns the free-form `--version` flag into a [`VersionSpec`] and pins the
//! `latest` sentinel to [`DEFAULT_TOFU_VERSION`], so that a run is
//! reproducible even when upstream publishes a new release.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version used when the caller asks for `latest` or passes nothing.
pub const DEFAULT_TOFU_VERSION: Version = Version {
    major: 1,
    minor: 8,
    patch: 2,
    pre: None,
};

/// A parsed semantic version: `MAJOR.MINOR.PATCH` with optional pre-release.
///
/// Build metadata (`+...`) is accepted and dropped. A leading `v` is
/// tolerated because release tags carry one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Pre-release suffix, e.g. `beta1` in `1.9.0-beta1`.
    pub pre: Option<String>,
}

impl Version {
    /// Create a release version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse a semantic version string.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let raw = raw.split_once('+').map_or(raw, |(v, _)| v);

        let (core, pre) = match raw.split_once('-') {
            Some((core, pre)) => (core, Some(parse_prerelease(input, pre)?)),
            None => (raw, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::invalid_version(
                input,
                "expected MAJOR.MINOR.PATCH",
            ));
        }

        let component = |s: &str| {
            if s.len() > 1 && s.starts_with('0') {
                return Err(Error::invalid_version(input, format!("'{s}' has a leading zero")));
            }
            if !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_version(input, format!("'{s}' is not a number")));
            }
            s.parse::<u64>()
                .map_err(|_| Error::invalid_version(input, format!("'{s}' is not a number")))
        };

        Ok(Self {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            patch: component(parts[2])?,
            pre,
        })
    }
}

/// Validate dot-separated pre-release identifiers: non-empty, `[0-9A-Za-z-]`,
/// and numeric identifiers without leading zeros.
fn parse_prerelease(input: &str, pre: &str) -> Result<String> {
    for ident in pre.split('.') {
        if ident.is_empty() {
            return Err(Error::invalid_version(input, "empty pre-release identifier"));
        }
        if !ident.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(Error::invalid_version(
                input,
                format!("invalid character in pre-release '{ident}'"),
            ));
        }
        if ident.len() > 1 && ident.starts_with('0') && ident.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_version(
                input,
                format!("pre-release '{ident}' has a leading zero"),
            ));
        }
    }
    Ok(pre.to_string())
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// Which engine version a run should provision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSpec {
    /// Whatever upstream currently publishes as its newest release.
    Latest,
    /// An exact release.
    Exact(Version),
}

impl VersionSpec {
    /// The exact version, if pinned.
    #[must_use]
    pub fn exact(&self) -> Option<&Version> {
        match self {
            Self::Latest => None,
            Self::Exact(v) => Some(v),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

/// Resolve the user-supplied version string against the pinned default.
///
/// `""` and `"latest"` resolve to [`DEFAULT_TOFU_VERSION`]. Anything else must
/// be a semantic version.
///
/// # Errors
///
/// Returns [`Error::InvalidVersion`] when the string does not parse.
pub fn resolve(input: &str) -> Result<VersionSpec> {
    resolve_with_default(input, &DEFAULT_TOFU_VERSION)
}

/// Like [`resolve`], with an explicit default for the `latest` sentinel.
pub fn resolve_with_default(input: &str, default: &Version) -> Result<VersionSpec> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
        return Ok(VersionSpec::Exact(default.clone()));
    }
    Version::parse(trimmed).map(VersionSpec::Exact)
}
