// src/pipeline/llvm.rs

//! LLVM-family stage implementation
//!
//! One configure+build+install pass through CMake and Ninja,
//! parameterized by the enabled/disabled sub-project lists and the
//! target backend. Unknown architectures get a broad multi-backend
//! build instead of an error: under-listing backends produces a
//! toolchain that cannot target the machine at all, while over-building
//! merely costs build time.

use tracing::debug;

use super::env::BuildEnv;
use super::exec::run_tool;
use super::StageError;
use crate::config::BuildConfig;
use crate::error::Result;
use crate::source::{ComponentRequest, SourceCache};

/// Backend set used when the architecture is not in the lookup table
const FALLBACK_BACKENDS: &str = "X86;AArch64;ARM;RISCV";

/// Map a triple's architecture field to the LLVM backend identifier
pub fn llvm_backend_for(arch: &str) -> &'static str {
    match arch.to_lowercase().as_str() {
        "x86_64" | "i386" | "i686" => "X86",
        "aarch64" => "AArch64",
        "arm" => "ARM",
        "riscv32" | "riscv64" => "RISCV",
        "mips" => "Mips",
        "powerpc" => "PowerPC",
        _ => FALLBACK_BACKENDS,
    }
}

/// Single-shot LLVM/Clang build
pub fn build_llvm(config: &BuildConfig, sources: &SourceCache, env: &BuildEnv) -> Result<()> {
    let request = ComponentRequest::llvm(&config.llvm_version);
    let src_dir = sources.acquire(&request)?;
    let build_dir = config.build_dir.join("llvm");
    std::fs::create_dir_all(&build_dir).map_err(|e| StageError::Io {
        context: format!("creating {}", build_dir.display()),
        source: e,
    })?;

    let backends = llvm_backend_for(&config.target.arch);
    debug!("LLVM backends for {}: {}", config.target.arch, backends);

    let build_type = if config.enable_debug { "Debug" } else { "Release" };
    let mut args = vec![
        src_dir.join("llvm").display().to_string(),
        format!("-DCMAKE_INSTALL_PREFIX={}", config.prefix.display()),
        format!("-DCMAKE_BUILD_TYPE={build_type}"),
        format!(
            "-DLLVM_ENABLE_PROJECTS={}",
            config.enable_components.join(";")
        ),
        format!("-DLLVM_TARGETS_TO_BUILD={backends}"),
        format!("-DLLVM_DEFAULT_TARGET_TRIPLE={}", config.target),
        format!(
            "-DLLVM_ENABLE_ASSERTIONS={}",
            if config.enable_assertions { "ON" } else { "OFF" }
        ),
        format!(
            "-DLLVM_ENABLE_LTO={}",
            if config.enable_lto { "ON" } else { "OFF" }
        ),
        "-DLLVM_INCLUDE_TESTS=OFF".to_string(),
        "-DLLVM_INCLUDE_EXAMPLES=OFF".to_string(),
        "-DLLVM_INCLUDE_BENCHMARKS=OFF".to_string(),
        "-DLLVM_ENABLE_TERMINFO=OFF".to_string(),
        "-DLLVM_ENABLE_ZLIB=OFF".to_string(),
        "-DLLVM_ENABLE_ZSTD=OFF".to_string(),
        "-G".to_string(),
        "Ninja".to_string(),
    ];
    args.extend(config.cmake_flags.iter().cloned());

    run_tool("cmake", &args, &build_dir, env)?;
    run_tool(
        "ninja",
        &[format!("-j{}", config.jobs)],
        &build_dir,
        env,
    )?;
    run_tool("ninja", &["install".to_string()], &build_dir, env)?;
    Ok(())
}
