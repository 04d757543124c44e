//! Project catalog: top-level logical groupings of the source tree.
//!
//! A project is an immediate, non-hidden subdirectory of the source root.
//! The catalog is rebuilt wholesale on request (`-P`) and kept sorted by
//! description, with undescribed projects after all described ones.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A named, path-identified grouping of source files.  Identity is `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Web-facing path of the project, `/` + directory name.
    pub path: String,
    /// Optional display description, used for catalog ordering.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

/// Catalog ordering: by description, `None` after every `Some`, two
/// `None`s equal.
pub fn catalog_order(a: &Project, b: &Project) -> Ordering {
    match (a.description.as_deref(), b.description.as_deref()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Catalog operations
// ---------------------------------------------------------------------------

/// Rebuild the project list from the immediate non-hidden subdirectories
/// of `source_root`, replacing the previous catalog wholesale.
pub fn rebuild(config: &mut RuntimeConfig, source_root: &Path) -> Result<()> {
    let entries = std::fs::read_dir(source_root)
        .with_context(|| format!("listing source root {}", source_root.display()))?;

    let mut projects = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", source_root.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry
            .file_type()
            .with_context(|| format!("inspecting {}", entry.path().display()))?
            .is_dir();
        if !is_dir {
            continue;
        }
        projects.push(Project {
            path: format!("/{name}"),
            name,
            description: None,
        });
    }

    projects.sort_by(catalog_order);
    config.projects = projects;
    Ok(())
}

/// Bind the default project to the catalog entry whose path matches
/// `wanted` exactly.  No match leaves the default unbound, silently.
pub fn bind_default(config: &mut RuntimeConfig, wanted: &str) {
    for project in &config.projects {
        if project.path == wanted {
            config.default_project = Some(project.path.clone());
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
