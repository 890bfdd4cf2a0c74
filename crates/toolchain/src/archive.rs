//! Release archive handling.
//!
//! OpenTofu ships each release as a `.tar.gz` containing the `tofu` binary
//! next to license and readme files. Only the binary is extracted.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;

/// A binary pulled out of a release archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBinary {
    /// File contents.
    pub contents: Vec<u8>,
    /// Permission bits recorded in the tar header.
    pub mode: u32,
}

/// Find the entry named exactly `binary_name` in a gzip-compressed tarball.
///
/// Entries in subdirectories do not match, even if their file name does.
///
/// # Errors
///
/// Returns `Error::BinaryNotFound` when the archive is exhausted without a
/// match and `Error::DecompressionFailed` when it cannot be read.
pub fn extract_binary(data: &[u8], binary_name: &str) -> Result<ExtractedBinary> {
    let decoder = GzDecoder::new(data);
    let mut archive = Archive::new(decoder);

    let entries = archive
        .entries()
        .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::DecompressionFailed(e.to_string()))?;
        let is_match = entry
            .path()
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?
            .as_os_str()
            == binary_name;

        if !is_match {
            continue;
        }

        let mode = entry
            .header()
            .mode()
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        log::debug!(
            "Found {binary_name} in archive ({} bytes, mode {mode:o})",
            contents.len()
        );
        return Ok(ExtractedBinary { contents, mode });
    }

    Err(Error::BinaryNotFound {
        binary: binary_name.to_string(),
    })
}

/// Write an extracted binary into `dir` and restore its permission bits.
///
/// Returns the absolute path of the written file.
pub fn write_executable(dir: &Path, file_name: &str, binary: &ExtractedBinary) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| Error::install(dir, e))?;

    let path = dir.join(file_name);
    fs::write(&path, &binary.contents).map_err(|e| Error::install(&path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(binary.mode))
            .map_err(|e| Error::install(&path, e))?;
    }

    fs::canonicalize(&path).map_err(|e| Error::install(&path, e))
}

/// Whether `path` is a regular file with an executable bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Build a `.tar.gz` in memory. Used by tests across the workspace.
///
/// # Panics
///
/// Panics if an entry cannot be encoded.
#[cfg(any(test, feature = "test-support"))]
pub fn build_targz(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    {
        let mut builder = tar::Builder::new(&mut encoder);
        for (name, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *data)
                .expect("append tar entry");
        }
        builder.finish().expect("finish tar stream");
    }
    encoder.finish().expect("finish gzip stream")
}
