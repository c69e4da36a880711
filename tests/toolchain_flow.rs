// tests/toolchain_flow.rs

//! End-to-end scenario tests over derivation, planning, and the
//! validation surface, mirroring the two canonical runs: a bare-metal
//! GCC target and an LLVM target with default components.

use crossforge::{plan, BuildConfig, BuildOptions, CLibrary, StageKind, Toolchain};

#[test]
fn test_bare_metal_gcc_scenario() {
    // x86_64-elf, C library "none"
    let config = BuildConfig::derive(BuildOptions {
        toolchain: Toolchain::Gcc,
        target: "x86_64-elf".to_string(),
        c_library: CLibrary::None,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.target.arch, "x86_64");
    assert_eq!(config.target.vendor, "elf");
    assert_eq!(config.target.os, "none");
    assert_eq!(config.target.env, "gnu");
    assert!(config.target.is_bare_metal());

    assert!(config.sysroot.is_none());
    assert!(config.libc_version.is_none());

    // Exactly two stages: no libc build, no second compiler pass.
    assert_eq!(
        plan(&config),
        [StageKind::Binutils, StageKind::CompilerBootstrap]
    );

    let bins = crossforge::validate::required_binaries(&config);
    for expected in [
        "x86_64-elf-gcc",
        "x86_64-elf-g++",
        "x86_64-elf-ld",
        "x86_64-elf-ar",
        "x86_64-elf-as",
        "x86_64-elf-objcopy",
    ] {
        assert!(bins.contains(&expected.to_string()), "missing {expected}");
    }
}

#[test]
fn test_gcc_with_libc_runs_both_compiler_passes() {
    let config = BuildConfig::derive(BuildOptions {
        toolchain: Toolchain::Gcc,
        target: "aarch64-linux-gnu".to_string(),
        c_library: CLibrary::Glibc,
        with_sysroot: true,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(
        plan(&config),
        [
            StageKind::Binutils,
            StageKind::CompilerBootstrap,
            StageKind::Libc,
            StageKind::CompilerFinish,
        ]
    );
    assert_eq!(config.libc_version.as_deref(), Some("2.38"));
    assert!(config
        .sysroot
        .as_ref()
        .unwrap()
        .ends_with("aarch64-linux-gnu/sysroot"));
}

#[test]
fn test_llvm_riscv_scenario() {
    // LLVM family, riscv64-unknown-elf, no explicit component list
    let config = BuildConfig::derive(BuildOptions {
        toolchain: Toolchain::Llvm,
        target: "riscv64-unknown-elf".to_string(),
        c_library: CLibrary::None,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.enable_components, ["clang", "lld", "compiler-rt"]);
    assert_eq!(
        crossforge::pipeline::llvm::llvm_backend_for(&config.target.arch),
        "RISCV"
    );
    assert_eq!(plan(&config), [StageKind::Llvm]);
}

#[test]
fn test_env_overlay_for_config() {
    let config = BuildConfig::derive(BuildOptions {
        target: "x86_64-elf".to_string(),
        jobs: 7,
        cflags: vec!["-pipe".to_string()],
        ..Default::default()
    })
    .unwrap();

    let env = crossforge::BuildEnv::for_config(&config);
    assert_eq!(env.get("MAKEFLAGS"), Some("-j7"));
    assert_eq!(env.get("CFLAGS"), Some("-O2 -pipe"));

    // Stage environments past the first see the prefix tools first.
    let staged = env.prepend_path(&config.prefix.join("bin"));
    let path = staged.get("PATH").unwrap();
    assert!(path.starts_with(&format!("{}:", config.prefix.join("bin").display())));
}
