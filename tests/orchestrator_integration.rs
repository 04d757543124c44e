//! End-to-end tests driving the orchestrator through the public API.
//!
//! Each test stands up a real source tree, data root and fake tag tool
//! in a temporary directory, then runs full invocations to verify:
//! - the two-pass option resolution (flags override `-R` file values
//!   regardless of position)
//! - fatal-before-stages behavior for a missing data root
//! - per-unit failure recovery (bad push target, failing repository)
//! - run idempotence on an unchanged filesystem

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tempfile::TempDir;

use quarry::cli::Cli;
use quarry::config::RuntimeConfig;
use quarry::engine;
use quarry::errors::QuarryError;
use quarry::orchestrator;

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

/// A complete fake deployment: source tree, data root and tag tool.
struct Fixture {
    dir: TempDir,
    source_root: PathBuf,
    data_root: PathBuf,
    tool: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source_root = dir.path().join("src");
        let data_root = dir.path().join("data");
        fs::create_dir(&source_root).unwrap();
        fs::create_dir(&data_root).unwrap();

        let tool = dir.path().join("ctags");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        }

        Fixture {
            dir,
            source_root,
            data_root,
            tool,
        }
    }

    fn create_source_file(&self, relative: &str, content: &str) {
        let p = self.source_root.join(relative);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, content).unwrap();
    }

    fn scratch_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Run `quarry -q -c <tool> <tail...>`; the caller supplies the
    /// positionals (data root first, then subtrees) inside `tail`.
    fn run_tail(&self, tail: &[&str]) -> Result<(), QuarryError> {
        let mut argv = vec![
            "quarry".to_string(),
            "-q".to_string(),
            "-c".to_string(),
            self.tool.display().to_string(),
        ];
        argv.extend(tail.iter().map(|s| s.to_string()));
        orchestrator::run(Cli::try_parse_from(argv).unwrap())
    }

    /// Run with `<flags...> <data_root>` and no subtree restriction.
    fn run(&self, flags: &[&str]) -> Result<(), QuarryError> {
        let mut tail: Vec<&str> = flags.to_vec();
        let data = self.data_root.display().to_string();
        tail.push(data.as_str());
        self.run_tail(&tail)
    }

    /// Run with `-s <source_root>` prepended to `flags`.
    fn run_with_source(&self, flags: &[&str]) -> Result<(), QuarryError> {
        let src = self.source_root.display().to_string();
        let mut args = vec!["-s", src.as_str()];
        args.extend_from_slice(flags);
        self.run(&args)
    }

    fn indexed_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        engine::list_files(&self.data_root, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Two-pass option resolution
// ---------------------------------------------------------------------------

#[test]
fn flags_override_config_file_regardless_of_position() {
    // A saved configuration claims verbose mode and a generous word
    // limit; the invocation overrides both no matter where -R sits.
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");

    let mut saved = RuntimeConfig::default();
    saved.verbose = true;
    saved.index_word_limit = 9999;
    saved.ignore_patterns = vec!["from-file".to_string()];
    let saved_path = fx.scratch_path("saved.toml");
    saved.save(&saved_path).unwrap();

    for r_first in [true, false] {
        let out = fx.scratch_path(if r_first { "out1.toml" } else { "out2.toml" });
        let r = saved_path.display().to_string();
        let w = out.display().to_string();
        let args_first = ["-R", r.as_str(), "-m", "7", "-n", "-W", w.as_str()];
        let args_last = ["-m", "7", "-n", "-W", w.as_str(), "-R", r.as_str()];
        fx.run_with_source(if r_first { &args_first } else { &args_last })
            .unwrap();

        let written = RuntimeConfig::load(&out).unwrap();
        assert_eq!(written.index_word_limit, 7, "r_first={r_first}");
        assert!(!written.verbose, "-q must override the file value");
        // File-supplied values without a competing flag survive.
        assert_eq!(written.ignore_patterns, vec!["from-file".to_string()]);
    }
}

#[test]
fn malformed_quick_scan_argument_never_reaches_the_run() {
    let err = Cli::try_parse_from(["quarry", "-Q", "yes", "/data"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

// ---------------------------------------------------------------------------
// End-to-end sequencing
// ---------------------------------------------------------------------------

#[test]
fn subtree_restriction_end_to_end() {
    let fx = Fixture::new();
    fx.create_source_file("myproj/a.c", "alpha beta");
    fx.create_source_file("other/b.c", "gamma");

    let src = fx.source_root.display().to_string();
    let data = fx.data_root.display().to_string();
    fx.run_tail(&["-s", src.as_str(), data.as_str(), "myproj"])
        .unwrap();

    assert_eq!(fx.indexed_files(), vec!["myproj/a.c"]);
    assert!(fx.data_root.join(engine::META_FILE).exists());
}

#[test]
fn missing_data_root_exits_before_any_stage() {
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");

    let missing = fx.scratch_path("not-created");
    let src = fx.source_root.display().to_string();
    let argv = [
        "quarry",
        "-q",
        "-s",
        src.as_str(),
        missing.to_str().unwrap(),
    ];
    let err = orchestrator::run(Cli::try_parse_from(argv).unwrap()).unwrap_err();
    assert!(matches!(err, QuarryError::Environment(_)));
    // Nothing past bootstrap ran: no marker, no index output.
    assert!(!missing.exists());
}

#[test]
fn run_is_idempotent_on_an_unchanged_tree() {
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");

    let out1 = fx.scratch_path("out1.toml");
    let out2 = fx.scratch_path("out2.toml");
    fx.run_with_source(&["-i", "*.log", "-W", &out1.display().to_string()])
        .unwrap();
    fx.run_with_source(&["-i", "*.log", "-W", &out2.display().to_string()])
        .unwrap();

    let first = RuntimeConfig::load(&out1).unwrap();
    let second = RuntimeConfig::load(&out2).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Per-unit failure recovery
// ---------------------------------------------------------------------------

#[test]
fn malformed_push_target_leaves_surrounding_stages_intact() {
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");
    let out = fx.scratch_path("out.toml");

    // -W runs before the push, the index stage runs between them; all of
    // it must survive the bad -U target.
    fx.run_with_source(&["-W", &out.display().to_string(), "-U", "host:1:extra"])
        .unwrap();

    assert!(out.exists());
    assert!(fx.data_root.join(engine::INDEX_DB).exists());
}

#[test]
fn failing_repository_does_not_stop_the_run() {
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");
    // A directory that looks like a repository but has no history.
    fs::create_dir_all(fx.source_root.join("broken/.git")).unwrap();

    fx.run_with_source(&["-S", "-H"]).unwrap();

    // The refresh failure was recovered and indexing still happened.
    assert!(fx.data_root.join(engine::INDEX_DB).exists());
}

// ---------------------------------------------------------------------------
// Marker-based source-root persistence
// ---------------------------------------------------------------------------

#[test]
fn second_run_reuses_the_recorded_source_root() {
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");

    fx.run_with_source(&["-n"]).unwrap();
    assert_eq!(
        quarry::config::read_source_marker(&fx.data_root),
        Some(fx.source_root.clone())
    );

    // No -s this time; bootstrap resolves it from the marker and the
    // index pass covers the same tree.
    fx.run(&[]).unwrap();
    assert_eq!(fx.indexed_files(), vec!["main.c"]);
}

// ---------------------------------------------------------------------------
// Maintenance sub-commands
// ---------------------------------------------------------------------------

#[test]
fn maintenance_acts_immediately_without_a_source_root() {
    let fx = Fixture::new();
    fx.create_source_file("main.c", "int main() {}");
    fx.run_with_source(&[]).unwrap();

    // -O needs neither -s nor a valid tag tool: it touches only the
    // index under the given data root.
    let data = fx.data_root.display().to_string();
    let argv = ["quarry", "-O", data.as_str()];
    orchestrator::run(Cli::try_parse_from(argv).unwrap()).unwrap();
}
