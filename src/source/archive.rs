// src/source/archive.rs

//! Release archive extraction
//!
//! Upstream toolchain releases ship as tar-family archives (gzip,
//! bzip2, xz) or zip. Format is decided by file name, the same way the
//! mirrors name them; an unrecognized suffix is a hard error, never a
//! guess.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};
use xz2::read::XzDecoder;

use super::AcquireError;

/// Supported release archive containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// .tar.gz / .tgz
    TarGz,
    /// .tar.bz2
    TarBz2,
    /// .tar.xz
    TarXz,
    /// .zip
    Zip,
}

impl ArchiveFormat {
    /// Detect the container from a file name
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") {
            Some(Self::TarXz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Extract `archive` under `dest_dir`
///
/// The archive's own top-level directory is preserved, matching how
/// upstream tarballs are laid out (`gcc-13.2.0/...`). Callers handle
/// idempotence by checking the expected output directory before
/// calling.
pub fn extract_archive(archive: &Path, dest_dir: &Path) -> Result<(), AcquireError> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let format = ArchiveFormat::from_name(&name)
        .ok_or_else(|| AcquireError::UnsupportedArchive { name: name.clone() })?;

    info!("Extracting {} ({}) to {}", name, format, dest_dir.display());
    std::fs::create_dir_all(dest_dir).map_err(|e| AcquireError::Io {
        context: format!("creating {}", dest_dir.display()),
        source: e,
    })?;

    let file = File::open(archive).map_err(|e| AcquireError::Io {
        context: format!("opening {}", archive.display()),
        source: e,
    })?;

    let unpack_err = |e: std::io::Error| AcquireError::Extraction {
        name: name.clone(),
        source: e,
    };

    match format {
        ArchiveFormat::TarGz => tar::Archive::new(GzDecoder::new(file))
            .unpack(dest_dir)
            .map_err(unpack_err)?,
        ArchiveFormat::TarBz2 => tar::Archive::new(BzDecoder::new(file))
            .unpack(dest_dir)
            .map_err(unpack_err)?,
        ArchiveFormat::TarXz => tar::Archive::new(XzDecoder::new(file))
            .unpack(dest_dir)
            .map_err(unpack_err)?,
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(file).map_err(|e| AcquireError::Extraction {
                name: name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
            zip.extract(dest_dir).map_err(|e| AcquireError::Extraction {
                name: name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
        }
    }

    debug!("Extracted {} entries root at {}", name, dest_dir.display());
    Ok(())
}
