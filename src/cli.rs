// src/cli.rs

//! CLI definitions for crossforge
//!
//! All command-line surface lives here; the implementations are in
//! the `commands` module. The core engine performs no flag parsing of
//! its own; this layer populates `BuildOptions` and hands it over.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{BuildOptions, CLibrary, Toolchain};

fn parse_toolchain(s: &str) -> Result<Toolchain, String> {
    Toolchain::parse(s).ok_or_else(|| format!("unknown toolchain family: {s}"))
}

/// Anchor a user-supplied path to the invocation directory
///
/// Stage subprocesses run with their build directory as cwd, so every
/// path that reaches configure/cmake flags has to be absolute.
fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}

fn parse_c_library(s: &str) -> Result<CLibrary, String> {
    CLibrary::parse(s).ok_or_else(|| format!("unknown C library: {s}"))
}

#[derive(Parser)]
#[command(name = "crossforge")]
#[command(author = "Crossforge Contributors")]
#[command(version)]
#[command(
    about = "Build cross-compilation toolchains from upstream source releases",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a toolchain (binutils + compiler + optional C library)
    Build(BuildArgs),

    /// Validate an existing toolchain installation
    Validate(ValidateArgs),

    /// Generate a GitHub Actions workflow for CI builds
    Workflow(WorkflowArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Toolchain family to build (gcc, llvm)
    #[arg(short, long, default_value = "gcc", value_parser = parse_toolchain)]
    pub toolchain: Toolchain,

    /// Target triple (e.g. x86_64-elf, arm-none-eabi, aarch64-linux-gnu)
    #[arg(long)]
    pub target: String,

    /// Installation prefix
    #[arg(long, default_value = "./install")]
    pub prefix: PathBuf,

    /// GCC version (GCC family)
    #[arg(long, default_value = crate::config::DEFAULT_GCC_VERSION)]
    pub gcc_version: String,

    /// Binutils version (GCC family)
    #[arg(long, default_value = crate::config::DEFAULT_BINUTILS_VERSION)]
    pub binutils_version: String,

    /// LLVM version (LLVM family)
    #[arg(long, default_value = crate::config::DEFAULT_LLVM_VERSION)]
    pub llvm_version: String,

    /// C library for the target (glibc, newlib, musl, none)
    #[arg(long, default_value = "none", value_parser = parse_c_library)]
    pub c_library: CLibrary,

    /// C library version (defaults per family)
    #[arg(long)]
    pub libc_version: Option<String>,

    /// Build with sysroot support
    #[arg(long)]
    pub with_sysroot: bool,

    /// Explicit sysroot path (default: <prefix>/<target>/sysroot)
    #[arg(long)]
    pub sysroot: Option<PathBuf>,

    /// Languages to enable, comma-separated
    #[arg(long, value_delimiter = ',', default_value = "c,c++")]
    pub enable_languages: Vec<String>,

    /// LLVM sub-projects to enable, comma-separated
    #[arg(long, value_delimiter = ',')]
    pub enable_components: Vec<String>,

    /// LLVM sub-projects to disable, comma-separated
    #[arg(long, value_delimiter = ',')]
    pub disable_components: Vec<String>,

    /// Parallel jobs for the native build tools (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Remove stage build directories before building
    #[arg(long)]
    pub clean_build: bool,

    /// Keep the build directory after installation
    #[arg(long)]
    pub keep_build_dir: bool,

    /// Enable link-time optimization
    #[arg(long)]
    pub enable_lto: bool,

    /// Build with debug symbols
    #[arg(long)]
    pub enable_debug: bool,

    /// Enable assertions (LLVM family)
    #[arg(long)]
    pub enable_assertions: bool,

    /// Optimization level (0, 1, 2, 3, s, z, fast)
    #[arg(long, default_value = "2")]
    pub optimize: String,

    /// Additional configure flag (repeatable)
    #[arg(long = "configure-flag", allow_hyphen_values = true)]
    pub configure_flags: Vec<String>,

    /// Additional CMake flag (repeatable)
    #[arg(long = "cmake-flag", allow_hyphen_values = true)]
    pub cmake_flags: Vec<String>,

    /// Additional CFLAG (repeatable)
    #[arg(long = "cflag", allow_hyphen_values = true)]
    pub cflags: Vec<String>,

    /// Additional CXXFLAG (repeatable)
    #[arg(long = "cxxflag", allow_hyphen_values = true)]
    pub cxxflags: Vec<String>,

    /// Additional LDFLAG (repeatable)
    #[arg(long = "ldflag", allow_hyphen_values = true)]
    pub ldflags: Vec<String>,

    /// Source tree directory
    #[arg(long, default_value = "./sources")]
    pub source_dir: PathBuf,

    /// Build directory
    #[arg(long, default_value = "./build")]
    pub build_dir: PathBuf,

    /// Download cache directory
    #[arg(long, default_value = "./.cache/downloads")]
    pub cache_dir: PathBuf,

    /// Run the (placeholder) deep test suite after validation
    #[arg(long)]
    pub run_tests: bool,

    /// CI integration mode
    #[arg(long)]
    pub ci: bool,

    /// Package the prefix as an artifact (requires --ci)
    #[arg(long)]
    pub upload_artifact: bool,
}

impl BuildArgs {
    /// Lower the parsed flags into the engine's options structure
    pub fn into_options(self) -> BuildOptions {
        BuildOptions {
            toolchain: self.toolchain,
            target: self.target,
            prefix: absolutize(self.prefix),
            gcc_version: self.gcc_version,
            binutils_version: self.binutils_version,
            llvm_version: self.llvm_version,
            c_library: self.c_library,
            libc_version: self.libc_version,
            enable_languages: self.enable_languages,
            enable_components: self.enable_components,
            disable_components: self.disable_components,
            jobs: self.jobs,
            clean_build: self.clean_build,
            keep_build_dir: self.keep_build_dir,
            enable_lto: self.enable_lto,
            enable_debug: self.enable_debug,
            enable_assertions: self.enable_assertions,
            optimize: self.optimize,
            sysroot: self.sysroot.map(absolutize),
            with_sysroot: self.with_sysroot,
            configure_flags: self.configure_flags,
            cmake_flags: self.cmake_flags,
            cflags: self.cflags,
            cxxflags: self.cxxflags,
            ldflags: self.ldflags,
            source_dir: absolutize(self.source_dir),
            build_dir: absolutize(self.build_dir),
            cache_dir: absolutize(self.cache_dir),
            run_tests: self.run_tests,
            ci_mode: self.ci,
            upload_artifact: self.upload_artifact,
        }
    }
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Toolchain family installed at the prefix
    #[arg(short, long, default_value = "gcc", value_parser = parse_toolchain)]
    pub toolchain: Toolchain,

    /// Target triple the toolchain was built for
    #[arg(long)]
    pub target: String,

    /// Installation prefix to validate
    #[arg(long, default_value = "./install")]
    pub prefix: PathBuf,

    /// Scratch directory for the test compilation
    #[arg(long, default_value = "./build")]
    pub build_dir: PathBuf,

    /// Also run the (placeholder) deep test suite
    #[arg(long)]
    pub run_tests: bool,
}

#[derive(Args)]
pub struct WorkflowArgs {
    /// Toolchain family the workflow defaults to
    #[arg(short, long, default_value = "gcc", value_parser = parse_toolchain)]
    pub toolchain: Toolchain,

    /// Default target triple for the workflow
    #[arg(long, default_value = "x86_64-elf")]
    pub target: String,

    /// Default C library for the workflow
    #[arg(long, default_value = "none", value_parser = parse_c_library)]
    pub c_library: CLibrary,

    /// Output path for the workflow file
    #[arg(short, long, default_value = ".github/workflows/toolchain.yml")]
    pub output: PathBuf,
}
