use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

/// quarry - prepares, indexes and distributes a source-code search deployment
///
/// Eg. quarry -s /usr/include /var/tmp/quarry_data rpc
#[derive(Parser, Debug)]
#[command(name = "quarry", version, about, disable_help_subcommand = true)]
pub struct Cli {
    /// Run quietly
    #[arg(short = 'q', overrides_with = "verbose")]
    pub quiet: bool,

    /// Verbose progress narration and full error detail
    #[arg(short = 'v', overrides_with = "quiet")]
    pub verbose: bool,

    /// Economical - skip auxiliary (xref) output, consumes less disk space
    #[arg(short = 'e')]
    pub economical: bool,

    /// Path to the tag-generation tool (ctags)
    #[arg(short = 'c', value_name = "PATH")]
    pub tag_tool: Option<PathBuf>,

    /// Read configuration from file before applying other flags
    /// (only the first occurrence counts)
    #[arg(short = 'R', value_name = "FILE")]
    pub read_config: Vec<PathBuf>,

    /// Write the resulting configuration to file
    #[arg(short = 'W', value_name = "FILE")]
    pub write_config: Option<PathBuf>,

    /// Send the resulting configuration to a listener at host:port
    #[arg(short = 'U', value_name = "HOST:PORT")]
    pub push_config: Option<String>,

    /// Generate a project for each top-level source-root directory
    #[arg(short = 'P')]
    pub gen_projects: bool,

    /// Use the project at this path as the default project
    #[arg(short = 'p', value_name = "PATH")]
    pub default_project: Option<String>,

    /// Turn quick context scan on (+) or off (-); when on, only the
    /// first 32k of a large file is scanned for context
    #[arg(short = 'Q', value_name = "+|-", allow_hyphen_values = true)]
    pub quick_scan: Option<QuickScanToggle>,

    /// Do not generate indexes
    #[arg(short = 'n')]
    pub no_index: bool,

    /// Refresh the history cache of every known repository
    #[arg(short = 'H')]
    pub refresh_history: bool,

    /// Root URL of the web front end, default is /source
    #[arg(short = 'w', value_name = "URL")]
    pub url_prefix: Option<String>,

    /// Ignore files or directories matching this glob (repeatable)
    #[arg(short = 'i', value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Maximum words of a file to index
    #[arg(short = 'm', value_name = "INT", value_parser = clap::value_parser!(u64).range(1..))]
    pub word_limit: Option<u64>,

    /// Search the source root for version-control repositories
    #[arg(short = 'S')]
    pub scan_repos: bool,

    /// Root directory of the source tree (default: last used source root)
    #[arg(short = 's', value_name = "SRC_ROOT")]
    pub source_root: Option<PathBuf>,

    /// Maintenance: optimize the index under DATA_ROOT, then exit
    #[arg(short = 'O', value_name = "DATA_ROOT")]
    pub optimize: Option<PathBuf>,

    /// Maintenance: list all indexed files under DATA_ROOT, then exit
    #[arg(short = 'l', value_name = "DATA_ROOT")]
    pub list_files: Option<PathBuf>,

    /// Maintenance: dump tokens occurring more than 5 times, then exit
    #[arg(short = 't', value_name = "DATA_ROOT")]
    pub dump_tokens: Option<PathBuf>,

    /// Directory where indexer output is stored
    #[arg(value_name = "DATA_ROOT")]
    pub data_root: Option<PathBuf>,

    /// Only process these files or directories under SRC_ROOT
    #[arg(value_name = "SUBTREE")]
    pub sub_files: Vec<String>,
}

/// Argument to `-Q`: only the first character counts, so `+x` enables
/// and `-x` disables; anything else is a usage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickScanToggle {
    On,
    Off,
}

impl FromStr for QuickScanToggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes().first() {
            Some(b'+') => Ok(QuickScanToggle::On),
            Some(b'-') => Ok(QuickScanToggle::Off),
            _ => Err("pass either '+' or '-' as argument to -Q".to_string()),
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
