use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use blockvfs::{FsConfig, Vfs};
use blockvfs_shell::{run_script, Shell};
use clap::Parser;
use log::debug;

/// An in-memory block file system driven one command per line.
#[derive(Parser, Debug)]
#[command(name = "blockvfs", version)]
struct Args {
    /// Total number of 512 byte blocks. Values above 5000 are clamped; missing
    /// or non-positive values use 1024.
    #[arg(allow_negative_numbers = true)]
    blocks: Option<i64>,

    /// Read commands from this file instead of standard input.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = FsConfig::from_requested(args.blocks);
    let fs = Vfs::in_memory(config)
        .with_context(|| format!("failed to allocate {} blocks", config.block_count))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = match args.script {
        Some(path) => run_script(fs, &path, &mut out)
            .with_context(|| format!("failed to run script {}", path.display()))?,
        None => {
            let stdin = io::stdin();
            Shell::new(fs, true).run(stdin.lock(), &mut out)?
        }
    };
    debug!("teardown finished: {:?}", report);
    Ok(())
}
