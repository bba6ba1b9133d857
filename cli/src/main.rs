mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{build, choropleth, export};
use tracing_subscriber::EnvFilter;

/// Log to stderr so stdout carries only the written path.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match &cli.command {
        Commands::Build(args) => build::run(&cli, args),
        Commands::Choropleth(args) => choropleth::run(&cli, args),
        Commands::Export(args) => export::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
