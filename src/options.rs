//! Option resolution: two passes over the parsed flag set.
//!
//! A previously saved configuration can be loaded with `-R`, yet every
//! other flag on the same invocation must still override values that file
//! supplies.  Resolution therefore happens in two explicit passes:
//!
//! 1. [`apply_pass1`] consults only `-R` and, when present, replaces the
//!    runtime configuration with the file's contents.
//! 2. [`apply_pass2`] folds every other supplied flag onto the (possibly
//!    file-loaded) configuration, so explicit flags win regardless of
//!    their position relative to `-R` in the argument vector.

use crate::cli::{Cli, QuickScanToggle};
use crate::config::RuntimeConfig;
use crate::errors::QuarryError;

/// Pass 1: load the configuration file named by `-R`, if any.  Only the
/// first occurrence counts; later `-R` flags are ignored.
pub fn apply_pass1(cli: &Cli, config: &mut RuntimeConfig) -> Result<(), QuarryError> {
    if let Some(path) = cli.read_config.first() {
        *config = RuntimeConfig::load(path)?;
    }
    Ok(())
}

/// Pass 2: apply every other supplied flag onto `config`.  `-R` is a
/// no-op here (already handled by pass 1).
pub fn apply_pass2(cli: &Cli, config: &mut RuntimeConfig) -> Result<(), QuarryError> {
    // -q and -v override each other at parse time, so whichever appeared
    // last in the argument vector is the one still set here.
    if cli.quiet {
        config.verbose = false;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.economical {
        config.generate_aux = false;
    }
    if let Some(path) = &cli.tag_tool {
        config.tag_tool_path = path.clone();
    }
    if let Some(url) = &cli.url_prefix {
        config.set_url_prefix(url);
    }
    if let Some(toggle) = cli.quick_scan {
        config.quick_context_scan = matches!(toggle, QuickScanToggle::On);
    }
    if let Some(limit) = cli.word_limit {
        config.index_word_limit = limit as usize;
    }
    for pattern in &cli.ignore_patterns {
        config.ignore_patterns.push(pattern.clone());
    }
    if let Some(source_root) = &cli.source_root {
        if !source_root.is_dir() {
            return Err(QuarryError::Environment(format!(
                "no such directory: {}",
                source_root.display()
            )));
        }
        config.source_root = Some(source_root.clone());
    }
    if let Some(data_root) = &cli.data_root {
        config.data_root = Some(data_root.clone());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["quarry"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn resolve(args: &[&str]) -> RuntimeConfig {
        let cli = cli(args);
        let mut config = RuntimeConfig::default();
        apply_pass1(&cli, &mut config).unwrap();
        apply_pass2(&cli, &mut config).unwrap();
        config
    }

    fn saved_config(dir: &std::path::Path) -> PathBuf {
        let mut config = RuntimeConfig::default();
        config.verbose = true;
        config.generate_aux = true;
        config.index_word_limit = 11;
        config.tag_tool_path = PathBuf::from("/from/file/ctags");
        config.ignore_patterns = vec!["from-file".to_string()];
        let path = dir.join("saved.toml");
        config.save(&path).unwrap();
        path
    }

    #[test]
    fn flags_override_file_values_when_r_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let saved = saved_config(dir.path());

        let config = resolve(&[
            "-R",
            saved.to_str().unwrap(),
            "-q",
            "-e",
            "-m",
            "777",
            "/data",
        ]);
        assert!(!config.verbose);
        assert!(!config.generate_aux);
        assert_eq!(config.index_word_limit, 777);
        // File-supplied values without a competing flag survive.
        assert_eq!(config.tag_tool_path, PathBuf::from("/from/file/ctags"));
    }

    #[test]
    fn flags_override_file_values_when_r_comes_last() {
        let dir = tempfile::tempdir().unwrap();
        let saved = saved_config(dir.path());

        let config = resolve(&[
            "-q",
            "-e",
            "-m",
            "777",
            "-R",
            saved.to_str().unwrap(),
            "/data",
        ]);
        assert!(!config.verbose);
        assert!(!config.generate_aux);
        assert_eq!(config.index_word_limit, 777);
    }

    #[test]
    fn ignore_patterns_append_to_file_supplied_ones() {
        let dir = tempfile::tempdir().unwrap();
        let saved = saved_config(dir.path());

        let config = resolve(&["-R", saved.to_str().unwrap(), "-i", "*.o", "/data"]);
        assert_eq!(config.ignore_patterns, vec!["from-file", "*.o"]);
    }

    #[test]
    fn only_the_first_read_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let first = saved_config(dir.path());

        let mut other = RuntimeConfig::default();
        other.index_word_limit = 5555;
        let second = dir.path().join("second.toml");
        other.save(&second).unwrap();

        let config = resolve(&[
            "-R",
            first.to_str().unwrap(),
            "-R",
            second.to_str().unwrap(),
            "/data",
        ]);
        assert_eq!(config.index_word_limit, 11);
        assert_eq!(config.tag_tool_path, PathBuf::from("/from/file/ctags"));
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let cli = cli(&["-R", "/definitely/not/here.toml", "/data"]);
        let mut config = RuntimeConfig::default();
        assert!(apply_pass1(&cli, &mut config).is_err());
    }

    #[test]
    fn quick_scan_toggle_applies() {
        assert!(!resolve(&["-Q", "-", "/data"]).quick_context_scan);
        assert!(resolve(&["-Q", "+", "/data"]).quick_context_scan);
    }

    #[test]
    fn no_flags_leave_quick_scan_at_default() {
        assert!(resolve(&["/data"]).quick_context_scan);
    }

    #[test]
    fn url_prefix_flag_is_normalized() {
        let config = resolve(&["-w", "grok", "/data"]);
        assert_eq!(config.url_prefix, "/grok/s?");
    }

    #[test]
    fn source_root_must_be_a_directory() {
        let cli = cli(&["-s", "/definitely/not/here", "/data"]);
        let mut config = RuntimeConfig::default();
        apply_pass1(&cli, &mut config).unwrap();
        let err = apply_pass2(&cli, &mut config).unwrap_err();
        assert!(matches!(err, QuarryError::Environment(_)));
        assert!(format!("{err}").contains("/definitely/not/here"));
    }

    #[test]
    fn positional_data_root_is_applied() {
        let config = resolve(&["/data"]);
        assert_eq!(config.data_root, Some(PathBuf::from("/data")));
    }

    #[test]
    fn verbose_flag_wins_over_a_quiet_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file_config = RuntimeConfig::default();
        file_config.verbose = false;
        let path = dir.path().join("quiet.toml");
        file_config.save(&path).unwrap();

        let config = resolve(&["-v", "-R", path.to_str().unwrap(), "/data"]);
        assert!(config.verbose);
    }

    #[test]
    fn quiet_and_verbose_apply_left_to_right() {
        assert!(resolve(&["-q", "-v", "/data"]).verbose);
        assert!(!resolve(&["-v", "-q", "/data"]).verbose);
    }

    #[test]
    fn resolution_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let src = dir.path().join("src");
        let args = [
            "-s",
            src.to_str().unwrap(),
            "-e",
            "-m",
            "42",
            "-i",
            "*.o",
            "/data",
        ];
        assert_eq!(resolve(&args), resolve(&args));
    }
}
