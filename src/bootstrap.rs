//! Environment bootstrap: finalize the roots and fail fast on an
//! unusable environment.
//!
//! Resolves `data_root` (flag or positional, required) and `source_root`
//! (flag, falling back to the `SRC_ROOT` marker a prior run left inside
//! the data root), validates both as existing directories, and checks
//! that the tag-generation tool is invocable — without executing it.
//! On success the marker is rewritten so the next run may omit `-s`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::{self, RuntimeConfig};
use crate::errors::QuarryError;

/// Finalize and validate the environment.  Any failure here is fatal and
/// aborts the run before the optional stages.
pub fn resolve(config: &mut RuntimeConfig) -> Result<(), QuarryError> {
    let data_root = config
        .data_root
        .clone()
        .ok_or_else(|| QuarryError::Usage("please specify a data root path".to_string()))?;
    require_directory(&data_root)?;

    let source_root = match config.source_root.clone() {
        Some(path) => path,
        None => config::read_source_marker(&data_root).ok_or_else(|| {
            QuarryError::Usage("please specify a source root with option -s".to_string())
        })?,
    };
    require_directory(&source_root)?;
    config.source_root = Some(source_root.clone());

    validate_tag_tool(&config.tag_tool_path)?;

    config::write_source_marker(&data_root, &source_root)?;
    Ok(())
}

/// Fail with a message naming the path unless it is an existing directory.
fn require_directory(path: &Path) -> Result<(), QuarryError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(QuarryError::Environment(format!(
            "no such directory: {}",
            path.display()
        )))
    }
}

// ---------------------------------------------------------------------------
// Tag tool validation
// ---------------------------------------------------------------------------

/// Check that the tag-generation tool is invocable: an existing,
/// executable file, either at the given path or (for a bare name) on
/// `PATH`.  The tool is never run here.
pub fn validate_tag_tool(tool: &Path) -> Result<PathBuf, QuarryError> {
    resolve_tool(tool, std::env::var_os("PATH").as_deref()).ok_or_else(|| {
        QuarryError::Environment(format!("tag tool is not invocable: {}", tool.display()))
    })
}

/// Resolve the tool against an explicit `PATH`-style variable, so tests
/// can inject their own instead of mutating the process environment.
fn resolve_tool(tool: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(tool, path_var, cwd).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
