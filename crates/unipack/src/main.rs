use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use unipack::{Bundler, Config};

/// JavaScript source bundler that produces a single .js file from
/// multi-module projects
#[derive(Parser, Debug)]
#[command(name = "unipack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry module of the program to bundle
    entry: PathBuf,

    /// Output file; defaults to the configured output, or stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let output = cli.output.clone().or_else(|| config.output.clone());
    let bundler = Bundler::new(config);

    match output {
        Some(path) => bundler.write_bundle(&cli.entry, &path),
        None => {
            let bundle = bundler.bundle(&cli.entry)?;
            std::io::stdout().write_all(bundle.as_bytes())?;
            Ok(())
        }
    }
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}
