//! scanform - command-line front end for the document pipeline.

mod cli;
mod commands;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    scanform::init_logging(cli.log_format);
    commands::run(cli)
}
