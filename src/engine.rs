//! Built-in index engine behind the IndexRunner interface.
//!
//! Combines:
//! - File walking with ignore-pattern support (`ignore` crate)
//! - Parallel tokenizing (rayon)
//! - SQLite storage for the file list and token table (rusqlite)
//!
//! The orchestrator only consumes the narrow surface here: [`build`] for
//! the indexing pass over `{data_root, source_root, subtrees}`, and the
//! maintenance operations [`optimize`], [`list_files`] and [`dump_tokens`]
//! backing `-O`, `-l` and `-t`.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use rayon::prelude::*;
use rusqlite::Connection;

/// Database file name inside the data root.
pub const INDEX_DB: &str = "index.db";

/// Metadata sidecar written after each indexing pass.
pub const META_FILE: &str = "meta.json";

/// Under quick context scan, only this prefix of a file is tokenized.
const QUICK_SCAN_BYTES: u64 = 32 * 1024;

/// `-t` dumps tokens occurring more than this many times.
const DICT_THRESHOLD: i64 = 5;

// ---------------------------------------------------------------------------
// Schema SQL
// ---------------------------------------------------------------------------

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    words INTEGER NOT NULL,
    last_indexed INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tokens (
    token TEXT NOT NULL,
    file TEXT NOT NULL,
    hits INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tokens_token ON tokens(token);
CREATE INDEX IF NOT EXISTS idx_tokens_file ON tokens(file);
"#;

// ---------------------------------------------------------------------------
// Request / stats
// ---------------------------------------------------------------------------

/// Everything the engine needs for one indexing pass.
pub struct IndexRequest<'a> {
    pub data_root: &'a Path,
    pub source_root: &'a Path,
    /// Subtree restriction; empty means the whole source root.
    pub sub_files: &'a [String],
    /// Glob patterns excluded from the walk.
    pub ignore_patterns: &'a [String],
    /// Cap on words indexed per file.
    pub word_limit: usize,
    /// Tokenize only the first 32k of each file.
    pub quick_scan: bool,
    /// Store the per-file token table (auxiliary output); `-e` skips it.
    pub generate_aux: bool,
}

/// Statistics returned after an indexing pass.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub file_count: usize,
    pub word_count: usize,
    pub elapsed: std::time::Duration,
}

/// Everything extracted from a single source file.
struct FileResult {
    /// Path relative to the source root (stored in the DB).
    rel_path: String,
    /// Words consumed, after the word limit was applied.
    words: usize,
    /// Token occurrence counts (empty when auxiliary output is off).
    tokens: Vec<(String, usize)>,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Run the indexing pass described by `req`.
///
/// Walks the requested subtrees, tokenizes files in parallel, and batch
/// inserts the results in a single transaction.  Re-indexing an unchanged
/// tree produces an identical database state.
pub fn build(req: &IndexRequest) -> Result<IndexStats> {
    let start = Instant::now();

    std::fs::create_dir_all(req.data_root)
        .with_context(|| format!("creating data root {}", req.data_root.display()))?;
    let conn = open(&req.data_root.join(INDEX_DB))?;

    let paths = collect_paths(req)?;

    let results: Vec<FileResult> = paths
        .par_iter()
        .filter_map(|path| tokenize_file(path, req))
        .collect();

    let word_count = batch_insert(&conn, &results)?;
    write_meta(req, results.len())?;

    Ok(IndexStats {
        file_count: results.len(),
        word_count,
        elapsed: start.elapsed(),
    })
}

/// Resolve the walk roots and collect every file to index.
fn collect_paths(req: &IndexRequest) -> Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if req.sub_files.is_empty() {
        vec![req.source_root.to_path_buf()]
    } else {
        let mut roots = Vec::new();
        for sub in req.sub_files {
            let root = req.source_root.join(sub);
            if !root.is_dir() && !root.is_file() {
                bail!("no such subtree under source root: {sub}");
            }
            roots.push(root);
        }
        roots
    };

    let mut overrides = OverrideBuilder::new(req.source_root);
    for pattern in req.ignore_patterns {
        // The `!` prefix in override globs means "exclude this pattern".
        overrides
            .add(&format!("!{pattern}"))
            .with_context(|| format!("invalid ignore pattern: {pattern}"))?;
    }
    let overrides = overrides.build().context("building ignore overrides")?;

    let mut paths = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for root in roots {
        let walk = WalkBuilder::new(&root)
            .standard_filters(true)
            .overrides(overrides.clone())
            .build();
        for entry in walk {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if entry.file_type().is_some_and(|ft| ft.is_file())
                && seen.insert(entry.path().to_path_buf())
            {
                paths.push(entry.into_path());
            }
        }
    }
    Ok(paths)
}

/// Tokenize one file, honoring the quick-scan bound and the word limit.
/// Unreadable files are skipped; that is the walk's concern, not a run
/// failure.
fn tokenize_file(path: &Path, req: &IndexRequest) -> Option<FileResult> {
    let mut bytes = std::fs::read(path).ok()?;
    if req.quick_scan && bytes.len() as u64 > QUICK_SCAN_BYTES {
        bytes.truncate(QUICK_SCAN_BYTES as usize);
    }
    let content = String::from_utf8_lossy(&bytes);

    let mut words = 0usize;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in content
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
    {
        if words == req.word_limit {
            break;
        }
        words += 1;
        if req.generate_aux {
            *counts.entry(token).or_insert(0) += 1;
        }
    }

    let rel_path = path
        .strip_prefix(req.source_root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();

    let mut tokens: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(t, n)| (t.to_string(), n))
        .collect();
    tokens.sort();

    Some(FileResult {
        rel_path,
        words,
        tokens,
    })
}

/// Insert all per-file results inside one transaction.  Returns the total
/// word count.
fn batch_insert(conn: &Connection, results: &[FileResult]) -> Result<usize> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    conn.execute_batch("BEGIN")?;
    let mut word_count = 0usize;
    for result in results {
        word_count += result.words;
        conn.execute(
            "DELETE FROM tokens WHERE file = ?1",
            rusqlite::params![result.rel_path],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO files (path, words, last_indexed) VALUES (?1, ?2, ?3)",
            rusqlite::params![result.rel_path, result.words as i64, now],
        )?;
        for (token, hits) in &result.tokens {
            conn.execute(
                "INSERT INTO tokens (token, file, hits) VALUES (?1, ?2, ?3)",
                rusqlite::params![token, result.rel_path, *hits as i64],
            )?;
        }
    }
    conn.execute_batch("COMMIT")
        .context("committing index transaction")?;
    Ok(word_count)
}

/// Write the metadata sidecar next to the database.
fn write_meta(req: &IndexRequest, file_count: usize) -> Result<()> {
    let meta = serde_json::json!({
        "source_root": req.source_root,
        "file_count": file_count,
        "auxiliary": req.generate_aux,
        "generated_at": SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    });
    let path = req.data_root.join(META_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&meta)?)
        .with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Connection management
// ---------------------------------------------------------------------------

/// Open (or create) the index database and apply the schema.
fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("opening index database {}", path.display()))?;
    conn.execute_batch(SCHEMA_SQL)
        .context("applying index schema")?;
    Ok(conn)
}

/// Open an existing index database; fails when none has been built yet.
fn open_existing(data_root: &Path) -> Result<Connection> {
    let path = data_root.join(INDEX_DB);
    if !path.exists() {
        bail!("no index found under {}", data_root.display());
    }
    Connection::open(&path).with_context(|| format!("opening index database {}", path.display()))
}

// ---------------------------------------------------------------------------
// Maintenance operations
// ---------------------------------------------------------------------------

/// `-O`: compact and re-analyze the index database.
pub fn optimize(data_root: &Path) -> Result<()> {
    let conn = open_existing(data_root)?;
    conn.execute_batch("VACUUM; ANALYZE;")
        .context("optimizing index database")
}

/// `-l`: print every indexed file path, sorted.
pub fn list_files(data_root: &Path, out: &mut dyn Write) -> Result<()> {
    let conn = open_existing(data_root)?;
    let mut stmt = conn.prepare("SELECT path FROM files ORDER BY path")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for row in rows {
        writeln!(out, "{}", row?)?;
    }
    Ok(())
}

/// `-t`: print every token occurring more than 5 times, sorted.  Useful
/// for building a dictionary.
pub fn dump_tokens(data_root: &Path, out: &mut dyn Write) -> Result<()> {
    let conn = open_existing(data_root)?;
    let mut stmt = conn.prepare(
        "SELECT token FROM tokens GROUP BY token HAVING SUM(hits) > ?1 ORDER BY token",
    )?;
    let rows = stmt.query_map([DICT_THRESHOLD], |row| row.get::<_, String>(0))?;
    for row in rows {
        writeln!(out, "{}", row?)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
