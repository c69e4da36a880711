// src/commands.rs

//! Command implementations
//!
//! Thin glue from parsed CLI arguments to the engine: derive the
//! configuration, run the pipeline, validate, finalize. Errors
//! propagate up to `main`, which owns the process exit code.

use anyhow::Result;
use tracing::info;

use crate::cli::{BuildArgs, ValidateArgs, WorkflowArgs};
use crate::config::{BuildConfig, BuildOptions};
use crate::install;
use crate::pipeline::{self, Pipeline};
use crate::validate;
use crate::workflow;

/// `crossforge build`
pub fn build(args: BuildArgs) -> Result<()> {
    let config = BuildConfig::derive(args.into_options())?;

    info!("Target:    {}", config.target);
    info!("Toolchain: {}", config.toolchain);
    info!("C library: {}", config.c_library);
    info!("Prefix:    {}", config.prefix.display());
    info!("Jobs:      {}", config.jobs);

    pipeline::preflight(&config)?;
    Pipeline::new(&config)?.run()?;
    validate::validate(&config)?;
    let record = install::install(&config)?;

    if !config.keep_build_dir && config.build_dir.exists() {
        info!("Removing build directory {}", config.build_dir.display());
        std::fs::remove_dir_all(&config.build_dir)?;
    }

    info!(
        "Build complete. Activate with: source {}",
        record.env_script.display()
    );
    Ok(())
}

/// `crossforge validate`
pub fn validate_existing(args: ValidateArgs) -> Result<()> {
    let config = BuildConfig::derive(BuildOptions {
        toolchain: args.toolchain,
        target: args.target,
        prefix: args.prefix,
        build_dir: args.build_dir,
        run_tests: args.run_tests,
        ..Default::default()
    })?;

    validate::validate(&config)?;
    info!("Toolchain at {} validated", config.prefix.display());
    Ok(())
}

/// `crossforge workflow`
pub fn generate_workflow(args: WorkflowArgs) -> Result<()> {
    let config = BuildConfig::derive(BuildOptions {
        toolchain: args.toolchain,
        target: args.target,
        c_library: args.c_library,
        ..Default::default()
    })?;

    workflow::save(&config, &args.output)?;
    Ok(())
}
