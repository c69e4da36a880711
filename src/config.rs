// src/config.rs

//! Build configuration derivation
//!
//! `BuildOptions` carries the raw knobs exactly as the CLI (or any
//! other frontend) collected them. `BuildConfig::derive` resolves them
//! against the target spec and per-family defaults into an immutable
//! snapshot that every later stage reads and none mutates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::target::TargetSpec;

/// Default component versions, one current release per family
pub const DEFAULT_GCC_VERSION: &str = "13.2.0";
pub const DEFAULT_BINUTILS_VERSION: &str = "2.42";
pub const DEFAULT_LLVM_VERSION: &str = "17.0.6";
pub const DEFAULT_GLIBC_VERSION: &str = "2.38";
pub const DEFAULT_NEWLIB_VERSION: &str = "4.3.0";
pub const DEFAULT_MUSL_VERSION: &str = "1.2.4";

/// LLVM sub-project defaults applied when the user supplies no lists
const LLVM_DEFAULT_ENABLE: &[&str] = &["clang", "lld", "compiler-rt"];
const LLVM_DEFAULT_DISABLE: &[&str] = &["libcxx", "libcxxabi", "libunwind"];

/// Errors raised while deriving a build configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("C library {family} requires a version (none supplied and no default known)")]
    UnresolvableLibcVersion { family: String },
}

/// Toolchain family to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// GCC + binutils, the classic staged cross build
    #[default]
    Gcc,
    /// LLVM/Clang via CMake + Ninja
    Llvm,
}

impl Toolchain {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Llvm => "llvm",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gcc" => Some(Self::Gcc),
            "llvm" | "clang" => Some(Self::Llvm),
            _ => None,
        }
    }
}

impl std::fmt::Display for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// C library family for the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CLibrary {
    Glibc,
    Newlib,
    Musl,
    /// Bare-metal: no C library, no libc build stage
    #[default]
    None,
}

impl CLibrary {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Glibc => "glibc",
            Self::Newlib => "newlib",
            Self::Musl => "musl",
            Self::None => "none",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "glibc" => Some(Self::Glibc),
            "newlib" => Some(Self::Newlib),
            "musl" => Some(Self::Musl),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// The hardcoded current release for this family, if any
    fn default_version(&self) -> Option<&'static str> {
        match self {
            Self::Glibc => Some(DEFAULT_GLIBC_VERSION),
            Self::Newlib => Some(DEFAULT_NEWLIB_VERSION),
            Self::Musl => Some(DEFAULT_MUSL_VERSION),
            Self::None => None,
        }
    }
}

impl std::fmt::Display for CLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Raw user-supplied build knobs, prior to derivation
///
/// Populated by the CLI layer; `Default` gives the same values the
/// CLI defaults to, which keeps library callers and tests honest.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub toolchain: Toolchain,
    pub target: String,
    pub prefix: PathBuf,

    pub gcc_version: String,
    pub binutils_version: String,
    pub llvm_version: String,

    pub c_library: CLibrary,
    pub libc_version: Option<String>,

    pub enable_languages: Vec<String>,
    pub enable_components: Vec<String>,
    pub disable_components: Vec<String>,

    pub jobs: usize,
    pub clean_build: bool,
    pub keep_build_dir: bool,
    pub enable_lto: bool,
    pub enable_debug: bool,
    pub enable_assertions: bool,
    pub optimize: String,

    pub sysroot: Option<PathBuf>,
    pub with_sysroot: bool,

    pub configure_flags: Vec<String>,
    pub cmake_flags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,

    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,

    pub run_tests: bool,
    pub ci_mode: bool,
    pub upload_artifact: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            toolchain: Toolchain::Gcc,
            target: "x86_64-elf".to_string(),
            prefix: PathBuf::from("./install"),
            gcc_version: DEFAULT_GCC_VERSION.to_string(),
            binutils_version: DEFAULT_BINUTILS_VERSION.to_string(),
            llvm_version: DEFAULT_LLVM_VERSION.to_string(),
            c_library: CLibrary::None,
            libc_version: None,
            enable_languages: vec!["c".to_string(), "c++".to_string()],
            enable_components: Vec::new(),
            disable_components: Vec::new(),
            jobs: default_jobs(),
            clean_build: false,
            keep_build_dir: false,
            enable_lto: false,
            enable_debug: false,
            enable_assertions: false,
            optimize: "2".to_string(),
            sysroot: None,
            with_sysroot: false,
            configure_flags: Vec::new(),
            cmake_flags: Vec::new(),
            cflags: Vec::new(),
            cxxflags: Vec::new(),
            ldflags: Vec::new(),
            source_dir: PathBuf::from("./sources"),
            build_dir: PathBuf::from("./build"),
            cache_dir: PathBuf::from("./.cache/downloads"),
            run_tests: false,
            ci_mode: false,
            upload_artifact: false,
        }
    }
}

/// Fully-resolved, immutable description of one build run
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
    pub toolchain: Toolchain,
    pub target: TargetSpec,
    pub prefix: PathBuf,

    pub gcc_version: String,
    pub binutils_version: String,
    pub llvm_version: String,

    pub c_library: CLibrary,
    /// Resolved libc version; `None` exactly when `c_library` is `None`
    pub libc_version: Option<String>,

    pub enable_languages: Vec<String>,
    pub enable_components: Vec<String>,
    pub disable_components: Vec<String>,

    pub jobs: usize,
    pub clean_build: bool,
    pub keep_build_dir: bool,
    pub enable_lto: bool,
    pub enable_debug: bool,
    pub enable_assertions: bool,
    pub optimize: String,

    /// Resolved sysroot path; set when sysroot support is in effect
    pub sysroot: Option<PathBuf>,
    pub with_sysroot: bool,

    pub configure_flags: Vec<String>,
    pub cmake_flags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,

    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,

    pub run_tests: bool,
    pub ci_mode: bool,
    pub upload_artifact: bool,
}

impl BuildConfig {
    /// Derive a resolved configuration from raw options
    ///
    /// Pure: no filesystem or network access. The only fatal condition
    /// at this point is a C library family whose version cannot be
    /// resolved; everything else defaults.
    pub fn derive(options: BuildOptions) -> Result<Self, ConfigError> {
        let target = TargetSpec::parse(&options.target);

        // Resolve the libc version from the family default when unset.
        let libc_version = match options.c_library {
            CLibrary::None => None,
            family => match options.libc_version {
                Some(v) => Some(v),
                None => match family.default_version() {
                    Some(v) => Some(v.to_string()),
                    None => {
                        return Err(ConfigError::UnresolvableLibcVersion {
                            family: family.name().to_string(),
                        })
                    }
                },
            },
        };

        // Sysroot requested but not pinned: prefix/<target>/sysroot
        let sysroot = match (&options.sysroot, options.with_sysroot) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(options.prefix.join(&options.target).join("sysroot")),
            (None, false) => None,
        };

        // LLVM sub-project defaults apply only when the user supplied
        // no explicit lists. GCC has no equivalent; empty means
        // "upstream defaults".
        let (enable_components, disable_components) = match options.toolchain {
            Toolchain::Llvm => {
                let enable = if options.enable_components.is_empty() {
                    LLVM_DEFAULT_ENABLE.iter().map(|s| s.to_string()).collect()
                } else {
                    options.enable_components
                };
                let disable = if options.disable_components.is_empty() {
                    LLVM_DEFAULT_DISABLE.iter().map(|s| s.to_string()).collect()
                } else {
                    options.disable_components
                };
                (enable, disable)
            }
            Toolchain::Gcc => (options.enable_components, options.disable_components),
        };

        let jobs = if options.jobs == 0 {
            default_jobs()
        } else {
            options.jobs
        };

        Ok(Self {
            toolchain: options.toolchain,
            target,
            prefix: options.prefix,
            gcc_version: options.gcc_version,
            binutils_version: options.binutils_version,
            llvm_version: options.llvm_version,
            c_library: options.c_library,
            libc_version,
            enable_languages: options.enable_languages,
            enable_components,
            disable_components,
            jobs,
            clean_build: options.clean_build,
            keep_build_dir: options.keep_build_dir,
            enable_lto: options.enable_lto,
            enable_debug: options.enable_debug,
            enable_assertions: options.enable_assertions,
            optimize: options.optimize,
            sysroot,
            with_sysroot: options.with_sysroot,
            configure_flags: options.configure_flags,
            cmake_flags: options.cmake_flags,
            cflags: options.cflags,
            cxxflags: options.cxxflags,
            ldflags: options.ldflags,
            source_dir: options.source_dir,
            build_dir: options.build_dir,
            cache_dir: options.cache_dir,
            run_tests: options.run_tests,
            ci_mode: options.ci_mode,
            upload_artifact: options.upload_artifact,
        })
    }

    /// The version of the primary component for this family
    pub fn toolchain_version(&self) -> &str {
        match self.toolchain {
            Toolchain::Gcc => &self.gcc_version,
            Toolchain::Llvm => &self.llvm_version,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
