use std::process::ExitCode;

use clap::Parser;

fn main() -> anyhow::Result<ExitCode> {
    tagnav::init();

    let cli = tagnav::cli::Cli::parse();
    tagnav::cli::run(cli)
}
