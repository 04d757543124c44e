//! Runtime configuration: the single shared state of one run.
//!
//! A [`RuntimeConfig`] is created once per invocation, mutated sequentially
//! by the option resolver and the pipeline stages, and read by everything
//! after bootstrap.  It round-trips through TOML for `-R` (load), `-W`
//! (persist) and the network push payload, and it carries the `SRC_ROOT`
//! marker-file helpers used to remember the last source root between runs.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::projects::Project;
use crate::repos::Repository;

/// Name of the marker file inside the data root remembering the last
/// source root, so later runs may omit `-s`.
pub const SOURCE_MARKER: &str = "SRC_ROOT";

/// Default cap on the number of words indexed per file.
pub const DEFAULT_WORD_LIMIT: usize = 60_000;

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Process-wide runtime configuration, exclusively owned by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Root of the source tree being indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<PathBuf>,
    /// Where the indexer stores its output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,
    /// Progress narration on stdout and full error detail.
    pub verbose: bool,
    /// Generate auxiliary (xref-style) output; `-e` turns this off.
    pub generate_aux: bool,
    /// Scan only the first 32k of large files for context snippets.
    pub quick_context_scan: bool,
    /// Path (or bare name, resolved via PATH) of the tag-generation tool.
    pub tag_tool_path: PathBuf,
    /// Web-facing URL prefix, normalized to the `<prefix>/s?` form.
    pub url_prefix: String,
    /// Cap on the number of words indexed per file.
    pub index_word_limit: usize,
    /// Glob patterns excluded from walks and indexing.
    pub ignore_patterns: Vec<String>,
    /// Path of the default project, if one was bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
    /// Known repositories, keyed by path relative to the source root.
    /// Replaced wholesale by discovery, never merged.
    pub repositories: BTreeMap<String, Repository>,
    /// Top-level projects, rebuilt wholesale by the catalog.
    pub projects: Vec<Project>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source_root: None,
            data_root: None,
            verbose: true,
            generate_aux: true,
            quick_context_scan: true,
            tag_tool_path: PathBuf::from("ctags"),
            url_prefix: "/source/s?".to_string(),
            index_word_limit: DEFAULT_WORD_LIMIT,
            ignore_patterns: Vec::new(),
            default_project: None,
            repositories: BTreeMap::new(),
            projects: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Setters with normalization
// ---------------------------------------------------------------------------

impl RuntimeConfig {
    /// Set the web URL prefix, normalizing the accepted input shapes
    /// (`foo`, `/foo`, `/foo/`, `http://...`) to the canonical
    /// `<prefix>/s?` form.
    pub fn set_url_prefix(&mut self, raw: &str) {
        let mut prefix = raw.to_string();
        if !(prefix.starts_with('/') || prefix.starts_with("http")) {
            prefix = format!("/{prefix}");
        }
        if prefix.ends_with('/') {
            self.url_prefix = format!("{prefix}s?");
        } else {
            self.url_prefix = format!("{prefix}/s?");
        }
    }
}

// ---------------------------------------------------------------------------
// TOML persistence
// ---------------------------------------------------------------------------

impl RuntimeConfig {
    /// Load a full configuration from a TOML file.  Missing keys fall back
    /// to their defaults so older files stay loadable.
    pub fn load(path: &Path) -> Result<RuntimeConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse configuration file: {}", path.display()))
    }

    /// Serialize to the TOML wire/disk representation.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing configuration")
    }

    /// Write the configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = self.to_toml()?;
        std::fs::write(path, payload)
            .with_context(|| format!("writing configuration file {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// SRC_ROOT marker file
// ---------------------------------------------------------------------------

/// Read the first line of the source-root marker inside `data_root`.
/// Returns `None` when the marker is absent or unreadable.
pub fn read_source_marker(data_root: &Path) -> Option<PathBuf> {
    let marker = data_root.join(SOURCE_MARKER);
    let file = std::fs::File::open(marker).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Record `source_root` as the last-used source root inside `data_root`.
pub fn write_source_marker(data_root: &Path, source_root: &Path) -> Result<()> {
    let marker = data_root.join(SOURCE_MARKER);
    std::fs::write(&marker, format!("{}\n", source_root.display()))
        .with_context(|| format!("writing source-root marker {}", marker.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
