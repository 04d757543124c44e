use std::process;

use clap::CommandFactory;

use quarry::errors::{EXIT_USAGE, QuarryError};
use quarry::{cli, orchestrator};

fn main() {
    // Zero arguments is not a parse error: with no graphical front end in
    // this build, it defers to the usage text.
    if std::env::args_os().len() <= 1 {
        eprintln!("{}", cli::Cli::command().render_help());
        process::exit(EXIT_USAGE);
    }

    let cli = cli::parse();
    if let Err(err) = orchestrator::run(cli) {
        report(&err);
        process::exit(err.exit_code());
    }
}

fn report(err: &QuarryError) {
    eprintln!("quarry: {err}");
    if err.wants_usage() {
        eprintln!("{}", cli::Cli::command().render_usage());
    }
}
