// src/install.rs

//! Installation finalization
//!
//! Writes the human-readable metadata and environment-activation
//! artifacts under the prefix, and optionally packages the whole
//! prefix as a distributable archive with a detached checksum. All
//! artifacts are written once and never mutated afterwards.

use chrono::Utc;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tracing::info;
use xz2::write::XzEncoder;

use crate::config::{BuildConfig, Toolchain};
use crate::error::Result;
use crate::hash::sha256_file;

/// Final artifact set for a completed installation
#[derive(Debug)]
pub struct InstallationRecord {
    pub version_file: PathBuf,
    pub env_script: PathBuf,
    /// Archive + detached checksum, when packaging was requested
    pub package: Option<(PathBuf, PathBuf)>,
}

/// Finalize a completed installation
pub fn install(config: &BuildConfig) -> Result<InstallationRecord> {
    info!("Finalizing installation in {}", config.prefix.display());
    fs::create_dir_all(&config.prefix)?;

    let version_file = write_version_file(config)?;
    let env_script = write_env_script(config)?;

    // Packaging is CI-only: both flags must be set together.
    let package = if config.ci_mode && config.upload_artifact {
        Some(create_package(config)?)
    } else {
        None
    };

    info!("Toolchain installed to {}", config.prefix.display());
    Ok(InstallationRecord {
        version_file,
        env_script,
        package,
    })
}

/// Human-readable version/configuration summary under the prefix
fn write_version_file(config: &BuildConfig) -> Result<PathBuf> {
    let path = config.prefix.join("VERSION.txt");

    let binutils = match config.toolchain {
        Toolchain::Gcc => config.binutils_version.as_str(),
        Toolchain::Llvm => "n/a",
    };
    let libc_version = config.libc_version.as_deref().unwrap_or("");

    let contents = format!(
        "Toolchain: {toolchain}\n\
         Target: {target}\n\
         Build date: {date}\n\
         \n\
         Versions:\n\
         - Toolchain: {version}\n\
         - Binutils: {binutils}\n\
         - C library: {libc} {libc_version}\n\
         \n\
         Configuration:\n\
         - Prefix: {prefix}\n\
         - Languages: {languages}\n\
         - Optimization: -O{optimize}\n\
         - LTO: {lto}\n\
         - Debug: {debug}\n\
         \n\
         Use 'source {env_script}' to set up the environment.\n",
        toolchain = config.toolchain.name().to_uppercase(),
        target = config.target,
        date = Utc::now().to_rfc2822(),
        version = config.toolchain_version(),
        binutils = binutils,
        libc = config.c_library,
        libc_version = libc_version,
        prefix = config.prefix.display(),
        languages = config.enable_languages.join(", "),
        optimize = config.optimize,
        lto = if config.enable_lto { "enabled" } else { "disabled" },
        debug = if config.enable_debug { "enabled" } else { "disabled" },
        env_script = config.prefix.join("environment").display(),
    );

    fs::write(&path, contents)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Executable shell script exporting the standard tool-name variables
fn write_env_script(config: &BuildConfig) -> Result<PathBuf> {
    let path = config.prefix.join("environment");

    let script = format!(
        r#"#!/bin/bash
# Toolchain environment setup for {target}

export TOOLCHAIN_PREFIX="{prefix}"
export TOOLCHAIN_TARGET="{target}"
export PATH="${{TOOLCHAIN_PREFIX}}/bin:${{PATH}}"

export CC="${{TOOLCHAIN_TARGET}}-gcc"
export CXX="${{TOOLCHAIN_TARGET}}-g++"
export AR="${{TOOLCHAIN_TARGET}}-ar"
export AS="${{TOOLCHAIN_TARGET}}-as"
export LD="${{TOOLCHAIN_TARGET}}-ld"
export STRIP="${{TOOLCHAIN_TARGET}}-strip"
export OBJCOPY="${{TOOLCHAIN_TARGET}}-objcopy"
export OBJDUMP="${{TOOLCHAIN_TARGET}}-objdump"
export RANLIB="${{TOOLCHAIN_TARGET}}-ranlib"
export READELF="${{TOOLCHAIN_TARGET}}-readelf"

if [ -f "${{TOOLCHAIN_PREFIX}}/bin/clang" ]; then
    export CLANG_CC="${{TOOLCHAIN_PREFIX}}/bin/clang"
    export CLANG_CXX="${{TOOLCHAIN_PREFIX}}/bin/clang++"
fi

if [ -d "${{TOOLCHAIN_PREFIX}}/${{TOOLCHAIN_TARGET}}/sysroot" ]; then
    export SYSROOT="${{TOOLCHAIN_PREFIX}}/${{TOOLCHAIN_TARGET}}/sysroot"
    export CFLAGS="${{CFLAGS}} --sysroot=${{SYSROOT}}"
    export CXXFLAGS="${{CXXFLAGS}} --sysroot=${{SYSROOT}}"
    export LDFLAGS="${{LDFLAGS}} --sysroot=${{SYSROOT}}"
fi

echo "Toolchain environment set for ${{TOOLCHAIN_TARGET}}"
echo "Prefix: ${{TOOLCHAIN_PREFIX}}"
"#,
        target = config.target,
        prefix = config.prefix.display(),
    );

    fs::write(&path, script)?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Compress the whole prefix into `<family>-<target>-<version>.tar.xz`
/// with a detached SHA-256 file next to it
fn create_package(config: &BuildConfig) -> Result<(PathBuf, PathBuf)> {
    let package_name = format!(
        "{}-{}-{}",
        config.toolchain.name(),
        config.target,
        config.toolchain_version()
    );
    fs::create_dir_all(&config.build_dir)?;
    let package_path = config.build_dir.join(format!("{package_name}.tar.xz"));

    info!("Packaging prefix into {}", package_path.display());
    let file = fs::File::create(&package_path)?;
    let encoder = XzEncoder::new(file, 6);
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(&package_name, &config.prefix)?;
    builder.into_inner()?.finish()?;

    let digest = sha256_file(&package_path)?;
    let checksum_path = config.build_dir.join(format!("{package_name}.tar.xz.sha256"));
    let file_name = package_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    fs::write(&checksum_path, format!("{digest}  {file_name}\n"))?;

    info!("Package checksum written to {}", checksum_path.display());
    Ok((package_path, checksum_path))
}
