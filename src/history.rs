//! History-cache refresh with per-repository failure isolation.
//!
//! Fans one unit of work per repository out onto the rayon pool and
//! funnels the outcomes back through a channel, so one repository's
//! failure can never cancel or block a sibling's.  The stage itself is
//! never fatal: failures are reported to stderr, attributed to their
//! repository, and the run continues.

use std::collections::BTreeMap;
use std::path::Path;

use crate::repos::Repository;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The result of one repository's cache refresh.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub id: String,
    /// `None` on success, otherwise the formatted error chain.
    pub error: Option<String>,
}

/// Aggregate statistics for a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub attempted: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

/// Refresh every known repository's history cache.
///
/// Every repository is attempted regardless of sibling failures; ordering
/// between repositories is not guaranteed.  Each failure is reported via
/// `report` exactly once, already attributed to its repository.
pub fn refresh_all(
    repositories: &BTreeMap<String, Repository>,
    data_root: &Path,
    mut report: impl FnMut(&RefreshOutcome),
) -> RefreshStats {
    let (tx, rx) = crossbeam_channel::unbounded::<RefreshOutcome>();

    let mut stats = RefreshStats {
        attempted: repositories.len(),
        failed: 0,
    };

    // The channel is unbounded, so workers never block on send and the
    // drain can wait until the scope has joined them all.  Draining
    // inside the scope would wedge a single-worker pool: the scope body
    // occupies the one worker while the queued units wait for it.
    rayon::scope(|scope| {
        for (id, repo) in repositories {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let error = repo
                    .create_cache(id, data_root)
                    .err()
                    .map(|e| format!("{e:#}"));
                // The receiver outlives every worker; a send failure would
                // mean the scope already unwound.
                let _ = tx.send(RefreshOutcome {
                    id: id.clone(),
                    error,
                });
            });
        }
    });
    drop(tx);

    for outcome in rx.iter() {
        if outcome.error.is_some() {
            stats.failed += 1;
        }
        report(&outcome);
    }

    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
