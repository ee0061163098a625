//! tabclean - clean CSV and Excel files from the command line

use clap::Parser;
use tabclean::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let failures = cli::run(&cli)?;
    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, cli.files.len());
    }
    Ok(())
}
