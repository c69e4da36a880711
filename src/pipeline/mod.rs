// src/pipeline/mod.rs

//! The staged build pipeline
//!
//! Stages form a fixed chain per toolchain family, not a generic
//! scheduler. The GCC family needs the classic two-pass bootstrap:
//! binutils first (assembler/linker before any compiler), then a
//! minimal compiler, then the C library built with that compiler, then
//! the full compiler build against the C library. The LLVM family is a
//! single meta-build invocation.
//!
//! Execution is strictly sequential and halts at the first failure.
//! Per-stage outcomes and wall times are appended to a JSON build
//! report next to the build trees; the report is write-only and never
//! consulted to skip work on a later run.

pub mod env;
pub mod exec;
pub mod gcc;
pub mod llvm;

pub use env::BuildEnv;

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{BuildConfig, CLibrary, Toolchain};
use crate::error::{Error, Result};
use crate::source::SourceCache;

/// File name of the per-run build report, under the build dir
const BUILD_REPORT_NAME: &str = "build-report.json";

/// Errors raised while executing a build stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{program} exited with code {code:?}:\n{excerpt}")]
    ToolFailed {
        program: String,
        code: Option<i32>,
        excerpt: String,
    },

    #[error("failed to start {program}: {reason}")]
    ToolNotFound { program: String, reason: String },

    #[error("stage {stage} is not implemented")]
    NotImplemented { stage: &'static str },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

/// One discrete unit of the build chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// Build and install binutils into the prefix
    Binutils,
    /// First compiler pass: driver + minimal runtime only
    CompilerBootstrap,
    /// Build the C library with the stage-1 compiler
    Libc,
    /// Second compiler pass: full build against the C library
    CompilerFinish,
    /// Single-shot LLVM/Clang meta-build
    Llvm,
    /// C library for the LLVM family (declared, not yet specified)
    LlvmLibc,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binutils => "binutils",
            Self::CompilerBootstrap => "compiler-bootstrap",
            Self::Libc => "libc",
            Self::CompilerFinish => "compiler-finish",
            Self::Llvm => "llvm",
            Self::LlvmLibc => "llvm-libc",
        }
    }

    /// Build subdirectory owned by this stage, if it has one of its
    /// own. `CompilerFinish` re-enters the bootstrap's directory and
    /// must never remove it.
    fn build_subdir(&self, config: &BuildConfig) -> Option<String> {
        match self {
            Self::Binutils => Some("binutils".to_string()),
            Self::CompilerBootstrap => Some("gcc".to_string()),
            Self::Libc => Some(config.c_library.name().to_string()),
            Self::CompilerFinish => None,
            Self::Llvm => Some("llvm".to_string()),
            Self::LlvmLibc => None,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check the host build tools a family needs before any stage starts
///
/// Catching a missing meta-build tool here beats failing forty minutes
/// into a compiler build.
pub fn preflight(config: &BuildConfig) -> Result<()> {
    let required: &[&str] = match config.toolchain {
        Toolchain::Gcc => &["make"],
        Toolchain::Llvm => &["cmake", "ninja"],
    };
    for tool in required {
        which::which(tool).map_err(|_| StageError::ToolNotFound {
            program: tool.to_string(),
            reason: "not found on PATH of the build host".to_string(),
        })?;
    }
    Ok(())
}

/// The fixed stage chain for a configuration
///
/// Pure function of family + C-library choice; the dependency order
/// between stages is encoded here and nowhere else.
pub fn plan(config: &BuildConfig) -> Vec<StageKind> {
    match (config.toolchain, config.c_library) {
        (Toolchain::Gcc, CLibrary::None) => {
            vec![StageKind::Binutils, StageKind::CompilerBootstrap]
        }
        (Toolchain::Gcc, _) => vec![
            StageKind::Binutils,
            StageKind::CompilerBootstrap,
            StageKind::Libc,
            StageKind::CompilerFinish,
        ],
        (Toolchain::Llvm, CLibrary::None) => vec![StageKind::Llvm],
        (Toolchain::Llvm, _) => vec![StageKind::Llvm, StageKind::LlvmLibc],
    }
}

/// Outcome of one executed stage, as recorded in the build report
#[derive(Debug, Serialize)]
struct StageRecord {
    stage: StageKind,
    ok: bool,
    duration_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Build report written after the run (success or failure)
#[derive(Debug, Serialize)]
struct BuildReport<'a> {
    target: &'a str,
    toolchain: Toolchain,
    completed_at: chrono::DateTime<Utc>,
    stages: Vec<StageRecord>,
}

/// Sequential executor for the planned stage chain
pub struct Pipeline<'a> {
    config: &'a BuildConfig,
    sources: SourceCache,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a BuildConfig) -> Result<Self> {
        let sources = SourceCache::new(config)?;
        Ok(Self { config, sources })
    }

    /// Run the full chain, halting at the first failure
    pub fn run(&self) -> Result<()> {
        let stages = plan(self.config);
        info!(
            "Build plan for {} ({}): {}",
            self.config.target,
            self.config.toolchain,
            stages
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        std::fs::create_dir_all(&self.config.build_dir)?;

        let base_env = BuildEnv::for_config(self.config);
        let prefix_bin = self.config.prefix.join("bin");

        let mut records = Vec::new();
        let mut failure: Option<Error> = None;

        for (index, stage) in stages.iter().enumerate() {
            // From the second stage onward the freshly installed tools
            // must win PATH resolution.
            let stage_env = if index >= 1 {
                base_env.prepend_path(&prefix_bin)
            } else {
                base_env.clone()
            };

            if self.config.clean_build {
                if let Some(subdir) = stage.build_subdir(self.config) {
                    let dir = self.config.build_dir.join(subdir);
                    if dir.exists() {
                        info!("Clean build: removing {}", dir.display());
                        std::fs::remove_dir_all(&dir)?;
                    }
                }
            }

            info!("=== Stage {}/{}: {} ===", index + 1, stages.len(), stage);
            let started = Instant::now();
            let outcome = self.run_stage(*stage, &stage_env);
            let duration_secs = started.elapsed().as_secs();

            match outcome {
                Ok(()) => {
                    info!("Stage {} completed in {}s", stage, duration_secs);
                    records.push(StageRecord {
                        stage: *stage,
                        ok: true,
                        duration_secs,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("Stage {} failed: {}", stage, e);
                    records.push(StageRecord {
                        stage: *stage,
                        ok: false,
                        duration_secs,
                        error: Some(e.to_string()),
                    });
                    failure = Some(e);
                    break;
                }
            }
        }

        self.write_report(records);

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn run_stage(&self, stage: StageKind, env: &BuildEnv) -> Result<()> {
        match stage {
            StageKind::Binutils => gcc::build_binutils(self.config, &self.sources, env),
            StageKind::CompilerBootstrap => {
                gcc::build_compiler_bootstrap(self.config, &self.sources, env)
            }
            StageKind::Libc => gcc::build_libc(self.config, &self.sources, env),
            StageKind::CompilerFinish => gcc::finish_compiler(self.config, env),
            StageKind::Llvm => llvm::build_llvm(self.config, &self.sources, env),
            // Declared but not yet specified for this family: loud
            // failure, never a silent pass.
            StageKind::LlvmLibc => Err(Error::Stage(StageError::NotImplemented {
                stage: "llvm-libc",
            })),
        }
    }

    /// Best-effort report write; a failed report never masks the run's
    /// real outcome.
    fn write_report(&self, stages: Vec<StageRecord>) {
        let report = BuildReport {
            target: &self.config.target.raw,
            toolchain: self.config.toolchain,
            completed_at: Utc::now(),
            stages,
        };
        let path = self.report_path();
        match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!("Could not write build report {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize build report: {}", e),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.config.build_dir.join(BUILD_REPORT_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;

    fn config_with(toolchain: Toolchain, c_library: CLibrary) -> BuildConfig {
        BuildConfig::derive(BuildOptions {
            toolchain,
            c_library,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_gcc_bare_metal_plan_is_two_stages() {
        let stages = plan(&config_with(Toolchain::Gcc, CLibrary::None));
        assert_eq!(stages, [StageKind::Binutils, StageKind::CompilerBootstrap]);
    }

    #[test]
    fn test_gcc_with_libc_plan_is_four_stages() {
        for family in [CLibrary::Glibc, CLibrary::Newlib, CLibrary::Musl] {
            let stages = plan(&config_with(Toolchain::Gcc, family));
            assert_eq!(
                stages,
                [
                    StageKind::Binutils,
                    StageKind::CompilerBootstrap,
                    StageKind::Libc,
                    StageKind::CompilerFinish,
                ]
            );
        }
    }

    #[test]
    fn test_llvm_plan_single_stage() {
        let stages = plan(&config_with(Toolchain::Llvm, CLibrary::None));
        assert_eq!(stages, [StageKind::Llvm]);
    }

    #[test]
    fn test_llvm_with_libc_includes_stub_stage() {
        let stages = plan(&config_with(Toolchain::Llvm, CLibrary::Musl));
        assert_eq!(stages, [StageKind::Llvm, StageKind::LlvmLibc]);
    }

    #[test]
    fn test_finish_stage_owns_no_build_dir() {
        let config = config_with(Toolchain::Gcc, CLibrary::Glibc);
        assert_eq!(StageKind::CompilerFinish.build_subdir(&config), None);
        assert_eq!(
            StageKind::Libc.build_subdir(&config),
            Some("glibc".to_string())
        );
    }
}
