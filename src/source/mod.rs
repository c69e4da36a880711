// src/source/mod.rs

//! Source acquisition: mirrors, download cache, and extraction
//!
//! Resolves a component name + version to a verified local source
//! tree. Each component carries an ordered mirror list; candidates are
//! tried mirror by mirror (with a secondary archive-name variant where
//! one exists) until one yields a verified artifact. Exhausting every
//! candidate is fatal to the run; there is no offline fallback.
//!
//! Extraction is idempotent by directory presence: if the expected
//! source root already exists it is reused as-is. A partially
//! extracted tree from an interrupted run is indistinguishable from a
//! complete one under this scheme; delete the directory to force a
//! re-extract.

mod archive;
mod client;

pub use archive::{extract_archive, ArchiveFormat};
pub use client::HttpFetcher;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BuildConfig, CLibrary};
use crate::hash::sha256_file;

/// Errors raised while acquiring component sources
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to initialize HTTP client: {0}")]
    ClientInit(String),

    #[error("failed to download {name} {version}: all mirrors exhausted")]
    MirrorsExhausted { name: String, version: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("unsupported archive format: {name}")]
    UnsupportedArchive { name: String },

    #[error("failed to extract {name}: {source}")]
    Extraction {
        name: String,
        source: std::io::Error,
    },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

/// Abstraction over the transport, so acquisition logic is testable
/// without a network
pub trait Fetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquireError>;
}

/// One required source artifact: name, version, and where to find it
#[derive(Debug, Clone)]
pub struct ComponentRequest {
    pub name: String,
    pub version: String,
    /// Primary archive file name on the mirrors
    pub archive: String,
    /// Secondary naming convention, tried per-mirror after the primary
    pub alt_archive: Option<String>,
    /// Ordered mirror base URLs (highest priority first)
    pub mirrors: Vec<String>,
    /// Path component between the mirror base and the archive name
    pub mirror_subdir: Option<String>,
    /// Expected SHA-256 of the archive, when known
    pub checksum: Option<String>,
}

impl ComponentRequest {
    pub fn gcc(version: &str) -> Self {
        Self {
            name: "gcc".to_string(),
            version: version.to_string(),
            archive: format!("gcc-{version}.tar.xz"),
            alt_archive: None,
            mirrors: vec![
                "https://ftp.gnu.org/gnu/gcc/".to_string(),
                "https://mirrors.kernel.org/gnu/gcc/".to_string(),
                "https://ftpmirror.gnu.org/gcc/".to_string(),
            ],
            mirror_subdir: Some(format!("gcc-{version}/")),
            checksum: None,
        }
    }

    pub fn binutils(version: &str) -> Self {
        Self {
            name: "binutils".to_string(),
            version: version.to_string(),
            archive: format!("binutils-{version}.tar.xz"),
            alt_archive: None,
            mirrors: vec![
                "https://ftp.gnu.org/gnu/binutils/".to_string(),
                "https://mirrors.kernel.org/gnu/binutils/".to_string(),
            ],
            mirror_subdir: None,
            checksum: None,
        }
    }

    pub fn llvm(version: &str) -> Self {
        Self {
            name: "llvm".to_string(),
            version: version.to_string(),
            archive: format!("llvm-project-{version}.src.tar.xz"),
            // Some releases were published without the .src infix.
            alt_archive: Some(format!("llvm-project-{version}.tar.xz")),
            mirrors: vec![
                "https://github.com/llvm/llvm-project/releases/download/llvmorg-".to_string(),
                "https://mirrors.edge.kernel.org/pub/llvm/".to_string(),
            ],
            mirror_subdir: Some(format!("{version}/")),
            checksum: None,
        }
    }

    /// Request for a C library family. `CLibrary::None` has no source.
    pub fn libc(family: CLibrary, version: &str) -> Option<Self> {
        match family {
            CLibrary::Glibc => Some(Self {
                name: "glibc".to_string(),
                version: version.to_string(),
                archive: format!("glibc-{version}.tar.xz"),
                alt_archive: None,
                mirrors: vec![
                    "https://ftp.gnu.org/gnu/glibc/".to_string(),
                    "https://mirrors.kernel.org/gnu/glibc/".to_string(),
                ],
                mirror_subdir: None,
                checksum: None,
            }),
            CLibrary::Newlib => Some(Self {
                name: "newlib".to_string(),
                version: version.to_string(),
                archive: format!("newlib-{version}.tar.gz"),
                alt_archive: None,
                mirrors: vec![
                    "https://sourceware.org/pub/newlib/".to_string(),
                    "https://mirrors.kernel.org/sourceware/newlib/".to_string(),
                ],
                mirror_subdir: None,
                checksum: None,
            }),
            CLibrary::Musl => Some(Self {
                name: "musl".to_string(),
                version: version.to_string(),
                archive: format!("musl-{version}.tar.gz"),
                alt_archive: None,
                mirrors: vec!["https://musl.libc.org/releases/".to_string()],
                mirror_subdir: None,
                checksum: None,
            }),
            CLibrary::None => None,
        }
    }

    /// Attach an expected SHA-256 digest
    pub fn with_checksum(mut self, digest: &str) -> Self {
        self.checksum = Some(digest.to_string());
        self
    }

    /// Archive names to try, in order
    fn candidate_names(&self) -> Vec<&str> {
        let mut names = vec![self.archive.as_str()];
        if let Some(alt) = &self.alt_archive {
            names.push(alt.as_str());
        }
        names
    }

    /// Candidate URL for an archive name on a given mirror
    fn url_for(&self, mirror: &str, archive_name: &str) -> String {
        match &self.mirror_subdir {
            Some(subdir) => format!("{mirror}{subdir}{archive_name}"),
            None => format!("{mirror}{archive_name}"),
        }
    }
}

/// Top-level directory the archive extracts to, by convention
/// `<archive name minus container suffix>`
fn source_root_name(archive_name: &str) -> &str {
    for suffix in [".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".zip"] {
        if let Some(stripped) = archive_name.strip_suffix(suffix) {
            return stripped;
        }
    }
    archive_name
}

/// Download cache + source tree manager
pub struct SourceCache {
    source_dir: PathBuf,
    cache_dir: PathBuf,
    fetcher: Box<dyn Fetcher>,
}

impl SourceCache {
    /// Cache backed by the real HTTP fetcher
    pub fn new(config: &BuildConfig) -> Result<Self, AcquireError> {
        let mut fetcher = HttpFetcher::new()?;
        if config.ci_mode {
            // Progress bars just clutter CI logs.
            fetcher = fetcher.quiet();
        }
        Ok(Self {
            source_dir: config.source_dir.clone(),
            cache_dir: config.cache_dir.clone(),
            fetcher: Box::new(fetcher),
        })
    }

    /// Cache with a caller-supplied transport (tests)
    pub fn with_fetcher(
        source_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        fetcher: Box<dyn Fetcher>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            cache_dir: cache_dir.into(),
            fetcher,
        }
    }

    /// Resolve a component to a local source tree
    ///
    /// Reuses a verified cached archive when possible, otherwise walks
    /// the mirror list; extracts unless the source root already exists.
    pub fn acquire(&self, request: &ComponentRequest) -> Result<PathBuf, AcquireError> {
        fs::create_dir_all(&self.source_dir).map_err(|e| AcquireError::Io {
            context: format!("creating {}", self.source_dir.display()),
            source: e,
        })?;
        fs::create_dir_all(&self.cache_dir).map_err(|e| AcquireError::Io {
            context: format!("creating {}", self.cache_dir.display()),
            source: e,
        })?;

        let archive_path = self.fetch_archive(request)?;
        let archive_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let source_root = self.source_dir.join(source_root_name(&archive_name));
        if source_root.exists() {
            // Directory presence is the completion signal; see module doc.
            debug!("Source tree already present: {}", source_root.display());
        } else {
            extract_archive(&archive_path, &self.source_dir)?;
        }

        // Stages invoke scripts from this tree with a different working
        // directory, so the path handed back must be absolute.
        source_root.canonicalize().map_err(|e| AcquireError::Io {
            context: format!("resolving {}", source_root.display()),
            source: e,
        })
    }

    /// Return a verified archive path, from cache or the mirrors
    fn fetch_archive(&self, request: &ComponentRequest) -> Result<PathBuf, AcquireError> {
        // Cache pass: any candidate that exists and verifies wins
        // without touching the network. A stale cached file is deleted
        // here and re-fetched below.
        for name in request.candidate_names() {
            let cached = self.cache_dir.join(name);
            if !cached.exists() {
                continue;
            }
            match &request.checksum {
                None => {
                    info!("Using cached {}", cached.display());
                    return Ok(cached);
                }
                Some(expected) => {
                    let actual = sha256_file(&cached).map_err(|e| AcquireError::Io {
                        context: format!("hashing {}", cached.display()),
                        source: e,
                    })?;
                    if actual == *expected {
                        info!("Using cached {} (checksum verified)", cached.display());
                        return Ok(cached);
                    }
                    warn!(
                        "Checksum mismatch on cached {}, re-downloading",
                        cached.display()
                    );
                    fs::remove_file(&cached).map_err(|e| AcquireError::Io {
                        context: format!("removing stale {}", cached.display()),
                        source: e,
                    })?;
                }
            }
        }

        // Mirror walk: per mirror, primary name first, then the
        // secondary naming variant, before moving to the next mirror.
        for mirror in &request.mirrors {
            for name in request.candidate_names() {
                let url = request.url_for(mirror, name);
                let dest = self.cache_dir.join(name);

                match self.fetcher.fetch(&url, &dest) {
                    Ok(()) => {
                        if let Some(expected) = &request.checksum {
                            let actual = sha256_file(&dest).map_err(|e| AcquireError::Io {
                                context: format!("hashing {}", dest.display()),
                                source: e,
                            })?;
                            if actual != *expected {
                                // Fresh download failed verification:
                                // fatal, never fall back to the bad file.
                                let _ = fs::remove_file(&dest);
                                return Err(AcquireError::ChecksumMismatch {
                                    file: name.to_string(),
                                    expected: expected.clone(),
                                    actual,
                                });
                            }
                        }
                        return Ok(dest);
                    }
                    Err(e) => {
                        warn!("Mirror failed: {}", e);
                        continue;
                    }
                }
            }
        }

        Err(AcquireError::MirrorsExhausted {
            name: request.name.clone(),
            version: request.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_root_name_strips_container_suffix() {
        assert_eq!(source_root_name("gcc-13.2.0.tar.xz"), "gcc-13.2.0");
        assert_eq!(source_root_name("newlib-4.3.0.tar.gz"), "newlib-4.3.0");
        assert_eq!(
            source_root_name("llvm-project-17.0.6.src.tar.xz"),
            "llvm-project-17.0.6.src"
        );
        assert_eq!(source_root_name("odd-name"), "odd-name");
    }

    #[test]
    fn test_gcc_urls_include_release_subdir() {
        let request = ComponentRequest::gcc("13.2.0");
        assert_eq!(
            request.url_for(&request.mirrors[0], &request.archive),
            "https://ftp.gnu.org/gnu/gcc/gcc-13.2.0/gcc-13.2.0.tar.xz"
        );
    }

    #[test]
    fn test_llvm_carries_alt_archive_name() {
        let request = ComponentRequest::llvm("17.0.6");
        assert_eq!(
            request.candidate_names(),
            ["llvm-project-17.0.6.src.tar.xz", "llvm-project-17.0.6.tar.xz"]
        );
        assert_eq!(
            request.url_for(&request.mirrors[0], &request.archive),
            "https://github.com/llvm/llvm-project/releases/download/llvmorg-17.0.6/llvm-project-17.0.6.src.tar.xz"
        );
    }

    #[test]
    fn test_libc_none_has_no_request() {
        assert!(ComponentRequest::libc(CLibrary::None, "1.0").is_none());
        assert!(ComponentRequest::libc(CLibrary::Musl, "1.2.4").is_some());
    }
}
