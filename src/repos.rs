//! Repository discovery and the per-repository history-cache handle.
//!
//! Discovery walks the source tree looking for version-control metadata
//! (`.git`, `.hg`) and replaces the known repository set wholesale.  Each
//! [`Repository`] exposes the one operation the driver needs: build or
//! refresh its history cache under the data root, by shelling out to the
//! repository's own log command.  Backend internals stay out of scope.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};

/// Subdirectory of the data root holding per-repository history caches.
pub const HISTORY_CACHE_DIR: &str = "historycache";

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// The kind of source-control system backing a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Git,
    Mercurial,
}

impl RepoKind {
    /// Name of the metadata directory that identifies this kind.
    fn marker(self) -> &'static str {
        match self {
            RepoKind::Git => ".git",
            RepoKind::Mercurial => ".hg",
        }
    }

    /// The external command that extracts the change history.
    fn log_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            RepoKind::Git => ("git", &["log", "--name-status"]),
            RepoKind::Mercurial => ("hg", &["log", "--verbose"]),
        }
    }
}

/// A discovered version-control repository under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Absolute path of the repository's working directory.
    pub path: PathBuf,
    pub kind: RepoKind,
}

impl Repository {
    /// Build or refresh this repository's history cache under `data_root`.
    ///
    /// Runs the repository's log command and writes the output to
    /// `<data_root>/historycache/<id>.log`.  Independently fallible: an
    /// error here is this repository's alone.
    pub fn create_cache(&self, id: &str, data_root: &Path) -> Result<()> {
        let (program, args) = self.kind.log_command();
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.path)
            .output()
            .with_context(|| format!("running {program} in {}", self.path.display()))?;
        if !output.status.success() {
            bail!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let cache_dir = data_root.join(HISTORY_CACHE_DIR);
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("creating {}", cache_dir.display()))?;
        let cache_file = cache_dir.join(format!("{}.log", sanitize_id(id)));
        std::fs::write(&cache_file, &output.stdout)
            .with_context(|| format!("writing history cache {}", cache_file.display()))
    }
}

/// Flatten a repository id into a single file-name component.
fn sanitize_id(id: &str) -> String {
    id.replace(['/', '\\'], "_")
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Detect what kind of repository, if any, has its root at `dir`.
fn detect_kind(dir: &Path) -> Option<RepoKind> {
    // `.git` may be a plain file in linked worktrees, so probe existence
    // rather than requiring a directory.
    for kind in [RepoKind::Git, RepoKind::Mercurial] {
        if dir.join(kind.marker()).exists() {
            return Some(kind);
        }
    }
    None
}

/// Scan the source tree for version-control repositories.
///
/// Returns the replacement repository map, keyed by path relative to the
/// source root (the source root itself gets the key `"."`).  Hidden
/// directories are not descended into, so repository internals are never
/// walked.
pub fn discover(source_root: &Path) -> BTreeMap<String, Repository> {
    let mut found = BTreeMap::new();

    let walk = WalkBuilder::new(source_root)
        // Discovery must see everything the user can index, including
        // files listed in .gitignore.
        .standard_filters(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !name.starts_with('.')
        })
        .build();

    for entry in walk {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
            continue;
        }
        let dir = entry.path();
        if let Some(kind) = detect_kind(dir) {
            let id = dir
                .strip_prefix(source_root)
                .map(|rel| {
                    if rel.as_os_str().is_empty() {
                        ".".to_string()
                    } else {
                        rel.to_string_lossy().into_owned()
                    }
                })
                .unwrap_or_else(|_| dir.to_string_lossy().into_owned());
            found.insert(
                id,
                Repository {
                    path: dir.to_path_buf(),
                    kind,
                },
            );
        }
    }

    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
