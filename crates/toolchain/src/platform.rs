//! Platform detection for release downloads.
//!
//! Maps Rust's `std::env::consts` names onto the names used in OpenTofu
//! release archives (`linux_amd64`, `darwin_arm64`, ...).

use crate::error::{Error, Result};
use crate::types::Platform;

/// Detect the current platform.
///
/// # Errors
///
/// Returns `Error::UnsupportedPlatform` if the OS or architecture has no
/// upstream release.
pub fn detect() -> Result<Platform> {
    from_consts(std::env::consts::OS, std::env::consts::ARCH)
}

/// Map an OS/architecture pair (as in `std::env::consts`) to release names.
///
/// | Host arch | Release arch |
/// |-----------|--------------|
/// | x86_64    | amd64        |
/// | aarch64   | arm64        |
/// | x86       | 386          |
/// | arm       | arm64        |
///
/// 32-bit `arm` hosts get the `arm64` archive. Upstream also publishes an
/// `arm` archive, but existing deployments depend on this mapping.
pub fn from_consts(os: &str, arch: &str) -> Result<Platform> {
    let unsupported = || Error::UnsupportedPlatform {
        os: os.to_string(),
        arch: arch.to_string(),
    };

    let release_os = match os {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        "freebsd" => "freebsd",
        "openbsd" => "openbsd",
        "solaris" => "solaris",
        _ => return Err(unsupported()),
    };

    let release_arch = match arch {
        "x86_64" => "amd64",
        "aarch64" | "arm" => "arm64",
        "x86" => "386",
        _ => return Err(unsupported()),
    };

    Ok(Platform::new(release_os, release_arch))
}
