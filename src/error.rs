// src/error.rs

//! Central error type for crossforge
//!
//! Each domain defines its own error enum next to the code that raises
//! it; this module unifies them so library consumers can match on a
//! single type. The binary catches `Error` once, at the outermost
//! boundary, and turns it into a process exit code.

use thiserror::Error;

use crate::config::ConfigError;
use crate::pipeline::StageError;
use crate::source::AcquireError;
use crate::validate::ValidateError;

/// Unified crossforge error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be derived (fatal before any stage runs)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Source acquisition failed (mirrors exhausted, bad checksum, bad archive)
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    /// A build stage failed (external tool error or unimplemented stage)
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Post-build validation failed
    #[error(transparent)]
    Validate(#[from] ValidateError),

    /// Filesystem operation failed outside any stage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
