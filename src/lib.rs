// src/lib.rs

//! Crossforge
//!
//! Orchestrates multi-stage cross-compilation toolchain builds from
//! upstream source releases: GCC + binutils with an optional C
//! library, or LLVM/Clang, for an arbitrary target triple.
//!
//! # Architecture
//!
//! - Target-first: a parsed [`target::TargetSpec`] drives every
//!   downstream default (C library, sysroot layout, LLVM backend)
//! - One immutable [`config::BuildConfig`] per run; no stage mutates it
//! - Sources resolve through mirror fallback with SHA-256 verification
//!   and a download cache ([`source`])
//! - Stages run strictly sequentially with explicit dependency order;
//!   the first failure halts the pipeline ([`pipeline`])
//! - Validation checks installed binaries and a trivial cross compile,
//!   never executing target binaries on the host ([`validate`])

pub mod cli;
pub mod commands;
pub mod config;
mod error;
pub mod hash;
pub mod install;
pub mod pipeline;
pub mod source;
pub mod target;
pub mod validate;
pub mod workflow;

pub use config::{BuildConfig, BuildOptions, CLibrary, Toolchain};
pub use error::{Error, Result};
pub use install::InstallationRecord;
pub use pipeline::{plan, BuildEnv, Pipeline, StageKind};
pub use source::{ComponentRequest, SourceCache};
pub use target::TargetSpec;
