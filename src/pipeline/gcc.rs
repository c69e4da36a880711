// src/pipeline/gcc.rs

//! GCC-family stage implementations
//!
//! The hard ordering constraint behind this chain: a C library cannot
//! be built without a working cross compiler, and a full compiler
//! cannot be built without a C library. So binutils is installed
//! first, the compiler is built twice (a minimal bootstrap pass, then
//! a full pass), and the C library lands in between, built with the
//! bootstrap compiler.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::env::BuildEnv;
use super::exec::{run_tool, run_tool_args};
use super::StageError;
use crate::config::{BuildConfig, CLibrary};
use crate::error::Result;
use crate::source::{ComponentRequest, SourceCache};

fn create_build_dir(config: &BuildConfig, subdir: &str) -> Result<PathBuf> {
    let dir = config.build_dir.join(subdir);
    fs::create_dir_all(&dir).map_err(|e| StageError::Io {
        context: format!("creating {}", dir.display()),
        source: e,
    })?;
    Ok(dir)
}

/// Run `<src>/configure` out-of-tree in `build_dir`
fn run_configure(
    src_dir: &Path,
    args: Vec<String>,
    build_dir: &Path,
    env: &BuildEnv,
) -> Result<()> {
    let configure = src_dir.join("configure").display().to_string();
    run_tool(&configure, &args, build_dir, env)?;
    Ok(())
}

fn make(args: &[&str], build_dir: &Path, env: &BuildEnv) -> Result<()> {
    run_tool_args("make", args, build_dir, env)?;
    Ok(())
}

/// Stage 1: build and install binutils into the shared prefix
///
/// The assembler and linker must exist before any compiler stage.
pub fn build_binutils(config: &BuildConfig, sources: &SourceCache, env: &BuildEnv) -> Result<()> {
    let request = ComponentRequest::binutils(&config.binutils_version);
    let src_dir = sources.acquire(&request)?;
    let build_dir = create_build_dir(config, "binutils")?;

    let mut args = vec![
        format!("--target={}", config.target),
        format!("--prefix={}", config.prefix.display()),
        "--disable-nls".to_string(),
        "--disable-werror".to_string(),
        "--disable-multilib".to_string(),
    ];
    if config.with_sysroot {
        args.push("--with-sysroot".to_string());
    }
    args.extend([
        "--enable-gold".to_string(),
        "--enable-plugins".to_string(),
        "--enable-deterministic-archives".to_string(),
    ]);
    args.extend(config.configure_flags.iter().cloned());

    run_configure(&src_dir, args, &build_dir, env)?;
    make(&[&format!("-j{}", config.jobs)], &build_dir, env)?;
    make(&["install"], &build_dir, env)?;
    Ok(())
}

/// Stage 2: bootstrap the compiler
///
/// Restricted to the driver and the minimal runtime support library;
/// the full compiler + standard library never builds in this pass.
/// With no C library requested the bootstrap output *is* the final
/// toolchain (bare-metal case).
pub fn build_compiler_bootstrap(
    config: &BuildConfig,
    sources: &SourceCache,
    env: &BuildEnv,
) -> Result<()> {
    let request = ComponentRequest::gcc(&config.gcc_version);
    let src_dir = sources.acquire(&request)?;
    let build_dir = create_build_dir(config, "gcc")?;

    // GMP/MPFR/MPC land in-tree so configure finds them.
    info!("Fetching GCC prerequisite libraries");
    let prerequisites = src_dir
        .join("contrib")
        .join("download_prerequisites")
        .display()
        .to_string();
    run_tool(&prerequisites, &[], &src_dir, env)?;

    let mut args = vec![
        format!("--target={}", config.target),
        format!("--prefix={}", config.prefix.display()),
        format!("--enable-languages={}", config.enable_languages.join(",")),
        "--disable-nls".to_string(),
        "--disable-multilib".to_string(),
    ];
    if config.c_library == CLibrary::None {
        // Bare-metal bootstrap: no libc headers exist yet.
        args.push("--without-headers".to_string());
    }
    if let Some(sysroot) = &config.sysroot {
        args.push(format!("--with-sysroot={}", sysroot.display()));
    }
    args.extend([
        "--disable-libssp".to_string(),
        "--disable-libstdcxx-pch".to_string(),
        "--disable-libgomp".to_string(),
        "--disable-libmudflap".to_string(),
        "--enable-checking=release".to_string(),
        "--with-gnu-as".to_string(),
        "--with-gnu-ld".to_string(),
    ]);
    args.extend(config.configure_flags.iter().cloned());

    run_configure(&src_dir, args, &build_dir, env)?;
    make(
        &[&format!("-j{}", config.jobs), "all-gcc", "all-target-libgcc"],
        &build_dir,
        env,
    )?;
    make(&["install-gcc", "install-target-libgcc"], &build_dir, env)?;
    Ok(())
}

/// Stage 3: build the requested C library with the stage-1 compiler
pub fn build_libc(config: &BuildConfig, sources: &SourceCache, env: &BuildEnv) -> Result<()> {
    // Derivation guarantees a resolved version for any planned libc
    // stage; a miss here is a planning bug, not a user error.
    let request = config
        .libc_version
        .as_deref()
        .and_then(|version| ComponentRequest::libc(config.c_library, version))
        .ok_or_else(|| StageError::Io {
            context: "resolving the libc stage".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "libc stage planned without a C library version",
            ),
        })?;
    let src_dir = sources.acquire(&request)?;
    let build_dir = create_build_dir(config, config.c_library.name())?;

    // The cross tools built so far do the compiling from here on.
    let env = env
        .with_var("CC", format!("{}-gcc", config.target))
        .with_var("CXX", format!("{}-g++", config.target));

    match config.c_library {
        CLibrary::Glibc => build_glibc(config, &src_dir, &build_dir, &env),
        CLibrary::Newlib => build_newlib(config, &src_dir, &build_dir, &env),
        CLibrary::Musl => build_musl(config, &src_dir, &build_dir, &env),
        CLibrary::None => unreachable!("libc stage never planned for none"),
    }
}

fn build_glibc(
    config: &BuildConfig,
    src_dir: &Path,
    build_dir: &Path,
    env: &BuildEnv,
) -> Result<()> {
    let mut args = vec![
        format!("--host={}", config.target),
        "--prefix=/usr".to_string(),
    ];
    if let Some(sysroot) = &config.sysroot {
        args.push(format!(
            "--with-headers={}",
            sysroot.join("usr").join("include").display()
        ));
    }
    args.push("--disable-werror".to_string());
    if config.target.is_linux() {
        args.push("--enable-obsolete-rpc".to_string());
    }
    args.extend(config.configure_flags.iter().cloned());

    run_configure(src_dir, args, build_dir, env)?;
    make(&[&format!("-j{}", config.jobs)], build_dir, env)?;

    // glibc installs into the sysroot, never the main prefix; with no
    // sysroot in effect there is nowhere sane to install to, so the
    // build output stays in the build tree.
    if let Some(sysroot) = &config.sysroot {
        make(
            &[&format!("DESTDIR={}", sysroot.display()), "install"],
            build_dir,
            env,
        )?;
    }
    Ok(())
}

fn build_newlib(
    config: &BuildConfig,
    src_dir: &Path,
    build_dir: &Path,
    env: &BuildEnv,
) -> Result<()> {
    let mut args = vec![
        format!("--target={}", config.target),
        format!("--prefix={}", config.prefix.display()),
        "--disable-nls".to_string(),
        "--disable-newlib-supplied-syscalls".to_string(),
        "--enable-multilib".to_string(),
    ];
    args.extend(config.configure_flags.iter().cloned());

    run_configure(src_dir, args, build_dir, env)?;
    make(&[&format!("-j{}", config.jobs)], build_dir, env)?;
    make(&["install"], build_dir, env)?;
    Ok(())
}

fn build_musl(
    config: &BuildConfig,
    src_dir: &Path,
    build_dir: &Path,
    env: &BuildEnv,
) -> Result<()> {
    let mut args = vec![
        format!("--target={}", config.target),
        format!("--prefix={}", config.prefix.display()),
        "--disable-shared".to_string(),
        "--enable-static".to_string(),
    ];
    args.extend(config.configure_flags.iter().cloned());

    run_configure(src_dir, args, build_dir, env)?;
    make(&[&format!("-j{}", config.jobs)], build_dir, env)?;
    make(&["install"], build_dir, env)?;
    Ok(())
}

/// Stage 4: second compiler pass
///
/// Re-enters the bootstrap's build directory, now that the C library
/// exists, and completes the full build + install.
pub fn finish_compiler(config: &BuildConfig, env: &BuildEnv) -> Result<()> {
    let build_dir = config.build_dir.join("gcc");
    if !build_dir.exists() {
        return Err(StageError::Io {
            context: format!(
                "re-entering compiler build dir {} (bootstrap must run first)",
                build_dir.display()
            ),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "build dir missing"),
        }
        .into());
    }

    make(&[&format!("-j{}", config.jobs)], &build_dir, env)?;
    make(&["install"], &build_dir, env)?;
    Ok(())
}
