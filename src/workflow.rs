// src/workflow.rs

//! GitHub Actions workflow generation
//!
//! Renders a CI pipeline description from a build configuration. The
//! configuration is read-only here; generated workflows are never
//! executed by this tool.

use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::{BuildConfig, Toolchain};
use crate::error::Result;

/// Render the workflow YAML for a configuration
pub fn render(config: &BuildConfig) -> String {
    let version_input = match config.toolchain {
        Toolchain::Gcc => "          --gcc-version ${{ github.event.inputs.gcc_version }} \\",
        Toolchain::Llvm => "          --llvm-version ${{ github.event.inputs.llvm_version }} \\",
    };

    format!(
        r#"name: Build cross toolchain

on:
  workflow_dispatch:
    inputs:
      toolchain:
        description: 'Toolchain family to build'
        required: true
        default: '{toolchain}'
        type: choice
        options:
          - gcc
          - llvm

      target:
        description: 'Target triple'
        required: true
        default: '{target}'
        type: string

      c_library:
        description: 'C library'
        required: false
        default: '{c_library}'
        type: choice
        options:
          - glibc
          - newlib
          - musl
          - none

      gcc_version:
        description: 'GCC version (GCC family)'
        required: false
        default: '{gcc_version}'
        type: string

      llvm_version:
        description: 'LLVM version (LLVM family)'
        required: false
        default: '{llvm_version}'
        type: string

jobs:
  build:
    runs-on: ubuntu-22.04

    steps:
    - name: Checkout
      uses: actions/checkout@v4

    - name: Install build prerequisites
      run: |
        sudo apt-get update
        sudo apt-get install -y \
          build-essential \
          bison \
          flex \
          libgmp-dev \
          libmpfr-dev \
          libmpc-dev \
          texinfo \
          libisl-dev \
          ninja-build \
          cmake \
          xz-utils

    - name: Build toolchain
      run: |
        crossforge build \
          --toolchain ${{{{ github.event.inputs.toolchain }}}} \
          --target ${{{{ github.event.inputs.target }}}} \
          --c-library ${{{{ github.event.inputs.c_library }}}} \
{version_input}
          --prefix ./install \
          --jobs "$(nproc)" \
          --clean-build \
          --run-tests \
          --ci \
          --upload-artifact

    - name: Upload artifact
      uses: actions/upload-artifact@v4
      with:
        name: ${{{{ github.event.inputs.toolchain }}}}-${{{{ github.event.inputs.target }}}}
        path: |
          ./build/*.tar.xz
          ./build/*.sha256
        retention-days: 7
"#,
        toolchain = config.toolchain,
        target = config.target,
        c_library = config.c_library,
        gcc_version = config.gcc_version,
        llvm_version = config.llvm_version,
        version_input = version_input,
    )
}

/// Render and write the workflow file, creating parent directories
pub fn save(config: &BuildConfig, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, render(config))?;
    info!("Workflow written to {}", output.display());
    Ok(())
}
