//! The top-level run sequence.
//!
//! Owns the strictly ordered pipeline
//! `ParseOptions → ApplyOptions → ResolveRoots/ValidateTagTool →
//! [RepositoryDiscovery] → [ProjectCatalog] → [PersistConfigLocally] →
//! [RefreshHistory] → [RunIndex] → [PushConfigToHost]`
//! and maps outcomes to a single exit status.  Maintenance invocations
//! (`-O`, `-l`, `-t`) perform their one action and return immediately.
//!
//! Failure policy: anything up to and including bootstrap is fatal, as
//! are a configuration-write failure and an index-stage error.  A single
//! repository's refresh failure and a bad push target are reported on
//! stderr and the run continues.

use std::time::Instant;

use crate::cli::Cli;
use crate::config::RuntimeConfig;
use crate::errors::QuarryError;
use crate::{bootstrap, distrib, engine, history, options, projects, repos};

/// Execute one full run for the parsed invocation.
pub fn run(cli: Cli) -> Result<(), QuarryError> {
    // Maintenance sub-commands exit after their single action, regardless
    // of any other flags.
    if let Some(data_root) = &cli.optimize {
        return engine::optimize(data_root).map_err(|e| stage_error("index optimize", e, false));
    }
    if let Some(data_root) = &cli.list_files {
        let mut stdout = std::io::stdout().lock();
        return engine::list_files(data_root, &mut stdout)
            .map_err(|e| stage_error("index listing", e, false));
    }
    if let Some(data_root) = &cli.dump_tokens {
        let mut stdout = std::io::stdout().lock();
        return engine::dump_tokens(data_root, &mut stdout)
            .map_err(|e| stage_error("token dump", e, false));
    }

    // Option resolution: load -R first, then let every other flag
    // override what the file supplied.
    let mut config = RuntimeConfig::default();
    options::apply_pass1(&cli, &mut config)?;
    options::apply_pass2(&cli, &mut config)?;

    bootstrap::resolve(&mut config)?;
    let verbose = config.verbose;
    let source_root = config
        .source_root
        .clone()
        .ok_or_else(|| QuarryError::Environment("source root not resolved".to_string()))?;
    let data_root = config
        .data_root
        .clone()
        .ok_or_else(|| QuarryError::Environment("data root not resolved".to_string()))?;

    if cli.scan_repos {
        if verbose {
            println!("Scanning for repositories...");
        }
        let start = Instant::now();
        config.repositories = repos::discover(&source_root);
        if verbose {
            println!(
                "Done searching for repositories ({}s, {} found)",
                start.elapsed().as_secs(),
                config.repositories.len()
            );
        }
    }

    if cli.gen_projects {
        projects::rebuild(&mut config, &source_root)
            .map_err(|e| stage_error("project catalog", e, verbose))?;
    }
    if let Some(wanted) = &cli.default_project {
        projects::bind_default(&mut config, wanted);
    }

    if let Some(path) = &cli.write_config {
        if verbose {
            println!("Writing configuration to {}", path.display());
        }
        distrib::write_config(&config, path)
            .map_err(|e| stage_error("configuration write", e, verbose))?;
        if verbose {
            println!("Done...");
        }
    }

    if cli.refresh_history {
        let stats = history::refresh_all(&config.repositories, &data_root, |outcome| {
            if let Some(error) = &outcome.error {
                eprintln!(
                    "failed to generate history cache for {}: {error}",
                    outcome.id
                );
            }
        });
        if verbose {
            println!(
                "History cache refresh: {} attempted, {} failed",
                stats.attempted, stats.failed
            );
        }
    }

    if !cli.no_index {
        let request = engine::IndexRequest {
            data_root: &data_root,
            source_root: &source_root,
            sub_files: &cli.sub_files,
            ignore_patterns: &config.ignore_patterns,
            word_limit: config.index_word_limit,
            quick_scan: config.quick_context_scan,
            generate_aux: config.generate_aux,
        };
        let stats = engine::build(&request).map_err(|e| stage_error("index build", e, verbose))?;
        if verbose {
            println!(
                "Indexed {} files ({} words) in {:.1}s",
                stats.file_count,
                stats.word_count,
                stats.elapsed.as_secs_f64()
            );
        }
    }

    if let Some(target) = &cli.push_config {
        if verbose {
            println!("Sending configuration to {target}");
        }
        match distrib::push_config(&config, target) {
            Ok(()) => {
                if verbose {
                    println!("Configuration successfully updated");
                }
            }
            // A bad or unreachable listener never aborts the run.
            Err(e) => eprintln!("failed to send configuration to {target}: {e:#}"),
        }
    }

    Ok(())
}

/// Wrap a stage failure, attaching the full error chain only in verbose
/// mode.
fn stage_error(stage: &str, err: anyhow::Error, verbose: bool) -> QuarryError {
    if verbose {
        QuarryError::Stage(format!("{stage} failed: {err:#}"))
    } else {
        QuarryError::Stage(format!("{stage} failed: {err}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
