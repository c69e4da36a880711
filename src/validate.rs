// src/validate.rs

//! Post-build toolchain validation
//!
//! Confirms the installation exposes the expected binaries and can
//! compile and link a trivial program for the target. The produced
//! binary is never executed: cross-compiled output does not run on the
//! build host.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{BuildConfig, Toolchain};

/// Tool names checked for the GCC family, prefixed with the target
const GCC_FAMILY_TOOLS: &[&str] = &["gcc", "g++", "ld", "ar", "as", "objcopy"];

/// Fixed tool names checked for the LLVM family (no target prefix)
const LLVM_FAMILY_TOOLS: &[&str] = &["clang", "clang++", "lld", "llvm-ar"];

/// Errors raised during validation
///
/// Validation failures are reported but never undo a completed
/// installation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("missing expected binaries in {bin_dir}: {}", .missing.join(", "))]
    MissingBinaries {
        bin_dir: String,
        missing: Vec<String>,
    },

    #[error("test compilation with {compiler} failed:\n{stderr}")]
    CompileFailed { compiler: String, stderr: String },

    #[error("could not run {compiler}: {reason}")]
    CompilerUnavailable { compiler: String, reason: String },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

/// The set of executables expected under `<prefix>/bin`
pub fn required_binaries(config: &BuildConfig) -> Vec<String> {
    match config.toolchain {
        Toolchain::Gcc => GCC_FAMILY_TOOLS
            .iter()
            .map(|tool| format!("{}-{}", config.target, tool))
            .collect(),
        Toolchain::Llvm => LLVM_FAMILY_TOOLS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Validate a built toolchain
pub fn validate(config: &BuildConfig) -> Result<(), ValidateError> {
    info!("Validating toolchain in {}", config.prefix.display());

    check_binaries(config)?;
    test_compilation(config)?;

    if config.run_tests {
        run_placeholder_suite(config);
    }

    info!("Toolchain validation passed");
    Ok(())
}

/// Presence check for the architecture-prefixed (or fixed) tool set
fn check_binaries(config: &BuildConfig) -> Result<(), ValidateError> {
    let bin_dir = config.prefix.join("bin");
    let missing: Vec<String> = required_binaries(config)
        .into_iter()
        .filter(|name| !bin_dir.join(name).exists())
        .collect();

    if missing.is_empty() {
        info!("All required binaries found in {}", bin_dir.display());
        Ok(())
    } else {
        Err(ValidateError::MissingBinaries {
            bin_dir: bin_dir.display().to_string(),
            missing,
        })
    }
}

/// Compile and link a trivial single-file program, without running it
fn test_compilation(config: &BuildConfig) -> Result<(), ValidateError> {
    let test_dir = config.build_dir.join("validate");
    fs::create_dir_all(&test_dir).map_err(|e| ValidateError::Io {
        context: format!("creating {}", test_dir.display()),
        source: e,
    })?;

    let source = test_dir.join("smoke.c");
    let program = format!(
        "int main(void) {{\n    /* trivial link test for {} */\n    return 0;\n}}\n",
        config.target
    );
    fs::write(&source, program).map_err(|e| ValidateError::Io {
        context: format!("writing {}", source.display()),
        source: e,
    })?;

    let compiler = compiler_driver(config);
    let output_path = test_dir.join("smoke.elf");

    let output = Command::new(&compiler)
        .arg(&source)
        .arg("-o")
        .arg(&output_path)
        .output()
        .map_err(|e| ValidateError::CompilerUnavailable {
            compiler: compiler.display().to_string(),
            reason: e.to_string(),
        })?;

    if output.status.success() {
        info!("Test compilation succeeded ({})", output_path.display());
        Ok(())
    } else {
        Err(ValidateError::CompileFailed {
            compiler: compiler.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        })
    }
}

/// Path of the compiler driver used for the smoke test
fn compiler_driver(config: &BuildConfig) -> PathBuf {
    let name = match config.toolchain {
        Toolchain::Gcc => format!("{}-gcc", config.target),
        Toolchain::Llvm => "clang".to_string(),
    };
    config.prefix.join("bin").join(name)
}

/// Placeholder for a deeper test-suite run
///
/// Always reports success; callers must not rely on it for
/// correctness guarantees until a real suite lands here.
fn run_placeholder_suite(config: &BuildConfig) {
    warn!(
        "Deep test suite for {} is a placeholder and always passes",
        config.target
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildOptions, CLibrary};
    use std::path::PathBuf;

    fn gcc_config(prefix: PathBuf, build_dir: PathBuf) -> BuildConfig {
        BuildConfig::derive(BuildOptions {
            target: "x86_64-elf".to_string(),
            prefix,
            build_dir,
            c_library: CLibrary::None,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_required_binaries_gcc_prefixed() {
        let config = gcc_config(PathBuf::from("/opt"), PathBuf::from("/tmp/b"));
        let bins = required_binaries(&config);
        assert!(bins.contains(&"x86_64-elf-gcc".to_string()));
        assert!(bins.contains(&"x86_64-elf-g++".to_string()));
        assert!(bins.contains(&"x86_64-elf-ld".to_string()));
        assert!(bins.contains(&"x86_64-elf-ar".to_string()));
        assert!(bins.contains(&"x86_64-elf-as".to_string()));
        assert!(bins.contains(&"x86_64-elf-objcopy".to_string()));
    }

    #[test]
    fn test_required_binaries_llvm_unprefixed() {
        let config = BuildConfig::derive(BuildOptions {
            toolchain: Toolchain::Llvm,
            target: "riscv64-unknown-elf".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(required_binaries(&config), ["clang", "clang++", "lld", "llvm-ar"]);
    }

    #[test]
    fn test_missing_binaries_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("prefix");
        let bin_dir = prefix.join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        // Provide two of the six expected tools
        fs::write(bin_dir.join("x86_64-elf-gcc"), b"").unwrap();
        fs::write(bin_dir.join("x86_64-elf-ld"), b"").unwrap();

        let config = gcc_config(prefix, dir.path().join("build"));
        let err = check_binaries(&config).unwrap_err();
        match err {
            ValidateError::MissingBinaries { missing, .. } => {
                assert_eq!(missing.len(), 4);
                assert!(missing.contains(&"x86_64-elf-g++".to_string()));
                assert!(!missing.contains(&"x86_64-elf-gcc".to_string()));
            }
            other => panic!("expected MissingBinaries, got {other:?}"),
        }
    }

    #[test]
    fn test_compiler_driver_paths() {
        let config = gcc_config(PathBuf::from("/opt/cross"), PathBuf::from("/tmp/b"));
        assert_eq!(
            compiler_driver(&config),
            PathBuf::from("/opt/cross/bin/x86_64-elf-gcc")
        );
    }
}
