//! unikey CLI - candidate-key discovery for tabular files.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Find {
            file,
            search,
            output,
            no_save,
        } => commands::find::run(file, search, output, no_save, cli.verbose),

        Commands::Scan {
            dir,
            exclude,
            jobs,
            search,
            no_save,
        } => commands::scan::run(dir, exclude, jobs, search, no_save, cli.verbose),

        Commands::Show { report, trace, json } => commands::show::run(report, trace, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("unikey=debug,warn")
        } else {
            EnvFilter::new("unikey=info,warn")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
