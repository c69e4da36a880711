// src/pipeline/exec.rs

//! External build tool invocation
//!
//! Every invocation is blocking and atomic: the orchestrator suspends
//! until the subprocess exits, a non-zero exit is immediately fatal to
//! the stage, and there are no retries or imposed timeouts. Output is
//! captured and a bounded excerpt is carried on the error for
//! diagnostics.

use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::env::BuildEnv;
use super::StageError;

/// Maximum bytes of tool output carried on a failure
const OUTPUT_EXCERPT_LIMIT: usize = 2000;

/// Keep the tail of captured output, bounded
///
/// The tail is where configure/make print the actual error.
fn excerpt(output: &str) -> String {
    if output.len() <= OUTPUT_EXCERPT_LIMIT {
        return output.trim_end().to_string();
    }
    let tail_start = output.len() - OUTPUT_EXCERPT_LIMIT;
    // Avoid splitting a UTF-8 sequence mid-character
    let tail_start = (tail_start..output.len())
        .find(|i| output.is_char_boundary(*i))
        .unwrap_or(output.len());
    format!("...{}", output[tail_start..].trim_end())
}

/// Run an external tool to completion
///
/// `program` resolves through the composed environment's PATH, which
/// is how later stages pick up freshly installed cross tools.
pub fn run_tool(
    program: &str,
    args: &[String],
    cwd: &Path,
    env: &BuildEnv,
) -> Result<(), StageError> {
    info!("Running {} {} (in {})", program, args.join(" "), cwd.display());

    let composed = env.compose();
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .env_clear()
        .envs(&composed)
        .output()
        .map_err(|e| StageError::ToolNotFound {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!("{} wrote {} bytes stdout, {} bytes stderr", program, stdout.len(), stderr.len());

    if !output.status.success() {
        let combined = if stderr.trim().is_empty() {
            stdout.to_string()
        } else {
            stderr.to_string()
        };
        return Err(StageError::ToolFailed {
            program: program.to_string(),
            code: output.status.code(),
            excerpt: excerpt(&combined),
        });
    }

    Ok(())
}

/// Convenience for `&str` argument lists
pub fn run_tool_args(
    program: &str,
    args: &[&str],
    cwd: &Path,
    env: &BuildEnv,
) -> Result<(), StageError> {
    let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    run_tool(program, &owned, cwd, env)
}
