//! Application error types and user-facing error formatting.
//!
//! The run sequence distinguishes three fatal classes:
//! - [`QuarryError::Usage`] for bad invocations (unknown flag, missing
//!   data root) — exit code 2, usage text printed by `main()`
//! - [`QuarryError::Environment`] for an unusable environment (missing
//!   source/data root, tag tool not invocable)
//! - [`QuarryError::Stage`] for a pipeline stage that failed after
//!   bootstrap (index build, configuration write)
//!
//! Per-unit failures (a single repository's history refresh, a malformed
//! push target) never become a `QuarryError`; they are caught and reported
//! at the loop that produced them.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.
///
/// * `0` - success
/// * `1` - environment or stage error
/// * `2` - usage / argument error (bad CLI invocation)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

// ---------------------------------------------------------------------------
// Unified application error
// ---------------------------------------------------------------------------

/// Unified fatal error type for the whole run.
///
/// Allows the orchestrator to propagate any stage's failure through a single
/// `Result` type while `main()` maps the variant to an exit code.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// A usage / argument error (exit code 2).
    #[error("{0}")]
    Usage(String),

    /// The resolved environment is unusable (exit code 1).
    #[error("{0}")]
    Environment(String),

    /// A pipeline stage failed after bootstrap (exit code 1).
    /// The message is preformatted by the orchestrator, with the full
    /// error chain included only in verbose mode.
    #[error("{0}")]
    Stage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuarryError {
    /// Return the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            QuarryError::Usage(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }

    /// Whether `main()` should append the usage text after the message.
    pub fn wants_usage(&self) -> bool {
        matches!(self, QuarryError::Usage(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
